//! Persisted snapshot envelope.
//!
//! A snapshot is the bridge between the in-memory local record and the local
//! key-value store. It pairs the record with the time it was captured so a
//! restarted session can pick up where it left off while offline.

use crate::{error::Result, Error, ProgressRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The `{record, capturedAt}` blob saved under a user's scope key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    /// Snapshot format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// The local record at capture time
    pub record: ProgressRecord,
    /// When the snapshot was taken (milliseconds since epoch)
    pub captured_at: Timestamp,
}

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

impl PersistedSnapshot {
    /// Capture `record` at `captured_at`.
    pub fn new(record: ProgressRecord, captured_at: Timestamp) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            record,
            captured_at,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// Rejects snapshots written by a newer format and normalizes the record.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        snapshot.record.normalize();
        Ok(snapshot)
    }
}
