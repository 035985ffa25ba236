//! FFI layer for game-runtime integration.
//!
//! This module provides C-compatible functions that can be called from a
//! game engine or mobile shell. All data crosses the boundary as JSON strings
//! using the same camelCase document shape as the remote record.
//!
//! # Memory Management
//!
//! - Strings returned by `tally_*` functions are allocated by Rust
//! - Caller must free them with `tally_string_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{
    ConflictDetector, ProgressRecord, ProgressUpdate, Resolve, ResolutionStrategy, Timestamp,
};
use serde::Serialize;
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(Serialize)]
#[serde(untagged)]
enum FfiResult<T: Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Outcome of [`tally_detect_conflict`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Detection {
    conflict: bool,
    divergent_fields: Vec<&'static str>,
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `tally_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::from(c"{\"error\":\"string contained null bytes\"}").into_raw(),
    }
}

fn error_string(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Read and parse a record argument.
unsafe fn record_arg(ptr: *const c_char, name: &str) -> Result<ProgressRecord, String> {
    let json = from_c_string(ptr).ok_or_else(|| format!("invalid {} JSON", name))?;
    ProgressRecord::from_json(&json).map_err(|e| format!("{}: {}", name, e))
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `tally_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn tally_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Detection & Resolution
// ============================================================================

/// Check two snapshots for a conflict.
///
/// # Arguments
/// - `local_json`, `server_json`: JSON strings of ProgressRecord
/// - `threshold_ms`: tolerated `lastModified` skew (use 1000 for the default)
///
/// # Returns
/// JSON string: `{"ok": {"conflict": bool, "divergentFields": [...]}}` or `{"error": "message"}`
///
/// # Safety
/// - `local_json` and `server_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tally_string_free`
#[no_mangle]
pub unsafe extern "C" fn tally_detect_conflict(
    local_json: *const c_char,
    server_json: *const c_char,
    threshold_ms: u64,
) -> *mut c_char {
    let local = match record_arg(local_json, "local") {
        Ok(r) => r,
        Err(e) => return error_string(e),
    };
    let server = match record_arg(server_json, "server") {
        Ok(r) => r,
        Err(e) => return error_string(e),
    };

    let detection = Detection {
        conflict: ConflictDetector::new(threshold_ms).detect(&local, &server),
        divergent_fields: ConflictDetector::divergent_fields(&local, &server),
    };
    to_c_string(FfiResult::ok(detection).to_json())
}

/// Resolve two snapshots with a named strategy.
///
/// # Arguments
/// - `strategy`: `server-wins`, `client-wins`, `timestamp`, or `merge`
///
/// # Returns
/// JSON string: `{"ok": ProgressRecord}` or `{"error": "message"}`
///
/// # Safety
/// - All arguments must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tally_string_free`
#[no_mangle]
pub unsafe extern "C" fn tally_resolve(
    local_json: *const c_char,
    server_json: *const c_char,
    strategy: *const c_char,
) -> *mut c_char {
    let strategy: ResolutionStrategy = match from_c_string(strategy).map(|s| s.parse()) {
        Some(Ok(s)) => s,
        Some(Err(e)) => return error_string(e.to_string()),
        None => return error_string("invalid strategy"),
    };
    let local = match record_arg(local_json, "local") {
        Ok(r) => r,
        Err(e) => return error_string(e),
    };
    let server = match record_arg(server_json, "server") {
        Ok(r) => r,
        Err(e) => return error_string(e),
    };

    match strategy.resolve(&local, &server) {
        Some(resolved) => to_c_string(FfiResult::ok(resolved).to_json()),
        None => error_string("conflict left unresolved"),
    }
}

/// Apply a partial update to a record, stamping `lastModified` with `now`.
///
/// # Returns
/// JSON string: `{"ok": ProgressRecord}` or `{"error": "message"}`
///
/// # Safety
/// - `record_json` and `update_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `tally_string_free`
#[no_mangle]
pub unsafe extern "C" fn tally_apply_update(
    record_json: *const c_char,
    update_json: *const c_char,
    now: Timestamp,
) -> *mut c_char {
    let mut record = match record_arg(record_json, "record") {
        Ok(r) => r,
        Err(e) => return error_string(e),
    };

    let update_str = match from_c_string(update_json) {
        Some(s) => s,
        None => return error_string("invalid update JSON"),
    };

    let update: ProgressUpdate = match serde_json::from_str(&update_str) {
        Ok(u) => u,
        Err(e) => return error_string(format!("parse error: {}", e)),
    };

    record.apply_update(&update, now);
    to_c_string(FfiResult::ok(record).to_json())
}

/// Check a record against the inventory and set invariants.
///
/// Unlike the other entry points the record is not normalized first.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `record_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `tally_string_free`
#[no_mangle]
pub unsafe extern "C" fn tally_validate(record_json: *const c_char) -> *mut c_char {
    let json = match from_c_string(record_json) {
        Some(s) => s,
        None => return error_string("invalid record JSON"),
    };

    let record: ProgressRecord = match serde_json::from_str(&json) {
        Ok(r) => r,
        Err(e) => return error_string(format!("parse error: {}", e)),
    };

    match record.validate() {
        Ok(()) => to_c_string(FfiResult::ok(()).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

// ============================================================================
// Info
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn tally_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn tally_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}
