//! # Tally Engine
//!
//! Deterministic conflict handling for offline-first player progress.
//!
//! This crate holds the pure half of the sync engine: the progress record
//! data model, the conflict detector, the conflict resolver (including the
//! field-wise merge), and the envelope used to persist snapshots locally.
//! Given the same two snapshots and the same strategy it always produces the
//! same result.
//!
//! ## Design Principles
//!
//! - **No IO**: nothing here touches files, sockets, or clocks
//! - **Deterministic**: same inputs always produce same outputs
//! - **Testable**: pure logic, no mocks needed
//! - **Portable**: usable natively, from WASM, or over the C ABI in [`ffi`]
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`ProgressRecord`] is the synchronized unit: scalar counters (level,
//! score, xp, coins, gems), an inventory keyed by item id, and two
//! append-only sets (unlocked areas, achievements). `lastModified` is the
//! only recency signal.
//!
//! ### Detection
//!
//! [`ConflictDetector`] flags a pair of snapshots as conflicting when their
//! `lastModified` values are more than a threshold apart (1000ms by default)
//! and score, level, or inventory differ.
//!
//! ### Resolution
//!
//! [`ResolutionStrategy`] picks the reconciled snapshot:
//! - [`ResolutionStrategy::ServerWins`] - server snapshot verbatim
//! - [`ResolutionStrategy::ClientWins`] - local snapshot verbatim
//! - [`ResolutionStrategy::Timestamp`] - newer `lastModified` wins, ties favor server (default)
//! - [`ResolutionStrategy::Merge`] - field-wise reconciliation, see [`merge_records`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tally_engine::{ConflictDetector, InventoryEntry, ProgressRecord, Resolve, ResolutionStrategy};
//!
//! let t = 1_706_745_600_000;
//!
//! let mut local = ProgressRecord::new(t);
//! local.score = 100;
//! local.level = 2;
//! local.inventory.push(InventoryEntry::new("a", "Acorn", 1, 2, t));
//!
//! let mut server = ProgressRecord::new(t);
//! server.score = 150;
//! server.level = 2;
//! server.last_modified = t + 2000;
//! server.inventory.push(InventoryEntry::new("a", "Acorn", 1, 1, t - 500));
//!
//! assert!(ConflictDetector::default().detect(&local, &server));
//!
//! let merged = ResolutionStrategy::Merge.resolve(&local, &server).unwrap();
//! assert_eq!(merged.score, 150);
//! assert_eq!(merged.inventory[0].quantity, 2);
//! assert_eq!(merged.inventory[0].discovered_at, t - 500);
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes detection, resolution and partial updates to
//! other runtimes (game engines, mobile shells). All data is exchanged as
//! JSON strings.
//!
//! ## Persistence
//!
//! [`PersistedSnapshot`] is the `{record, capturedAt}` blob written to the
//! local key-value store. It serializes to JSON and carries a format version.

pub mod detect;
pub mod error;
pub mod ffi;
pub mod merge;
pub mod record;
pub mod resolve;
pub mod snapshot;

// Re-export main types at crate root
pub use detect::{ConflictDetector, DEFAULT_CONFLICT_THRESHOLD_MS};
pub use error::Error;
pub use merge::merge_records;
pub use record::{InventoryEntry, ProgressRecord, ProgressUpdate};
pub use resolve::{Resolve, ResolutionStrategy};
pub use snapshot::{PersistedSnapshot, SNAPSHOT_FORMAT_VERSION};

/// Type aliases for clarity
pub type UserId = String;
pub type ItemId = String;
pub type Timestamp = u64;
