//! # Tally Client
//!
//! Offline-first synchronization of a player's progress record with a
//! remote, authoritative copy.
//!
//! The pure decisions (is this a conflict, what is the reconciled record)
//! live in [`tally_engine`]. This crate wires them to the outside world:
//!
//! - [`RemoteSource`] - the authoritative document store (fetch, write, push subscription)
//! - [`LocalStore`] - durable key-value blobs for offline continuity
//! - [`IdentityProvider`] - who the current user is
//! - [`SyncOrchestrator`] - the session that drives detect, resolve, persist and notify
//!
//! In-process implementations ([`MemoryRemote`], [`MemoryStore`],
//! [`FileStore`], [`StaticIdentity`]) cover tests, demos, and single-process
//! setups.
//!
//! ## Failure model
//!
//! Public orchestrator methods never return `Err` and never panic across the
//! boundary. Each returns a [`SyncOutcome`]:
//! - connectivity failures are reported as success with `is_offline` set
//! - missing user or missing server record are reported as failures
//! - local store failures are logged and otherwise ignored
//! - an unresolved conflict goes to the conflict listeners

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod memory;
pub mod notify;
pub mod orchestrator;
pub mod outcome;
pub mod remote;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SyncConfig};
pub use error::{Result, SyncError};
pub use identity::{IdentityProvider, StaticIdentity};
pub use memory::MemoryRemote;
pub use notify::{ConflictRecord, ListenerHandle, ListenerId, Listeners};
pub use orchestrator::SyncOrchestrator;
pub use outcome::SyncOutcome;
pub use remote::{
    ChangeReceiver, ChangeSender, RemoteError, RemoteErrorKind, RemoteSource, SubscriptionId,
};
pub use store::{FileStore, LocalStore, MemoryStore, StoreError};
