//! Remote data source abstraction.
//!
//! The remote source holds the authoritative copy of each user's record. The
//! engine only needs point reads, point writes, and a push subscription that
//! fires on every change, including the engine's own writes.

use async_trait::async_trait;
use std::fmt;
use tally_engine::ProgressRecord;
use tokio::sync::mpsc;

/// Channel on which a subscription delivers remote changes.
///
/// `None` means the remote record was removed.
pub type ChangeSender = mpsc::UnboundedSender<Option<ProgressRecord>>;

/// Receiving half of a [`ChangeSender`].
pub type ChangeReceiver = mpsc::UnboundedReceiver<Option<ProgressRecord>>;

/// Classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The remote could not be reached; retrying later may succeed
    Connectivity,
    /// Credentials were missing or refused
    Unauthorized,
    /// The remote refused the request
    Rejected,
    /// Anything else
    Other,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteErrorKind::Connectivity => "connectivity",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::Rejected => "rejected",
            RemoteErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Structured error returned by a [`RemoteSource`] adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Connectivity, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unauthorized, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Other, message)
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind == RemoteErrorKind::Connectivity
    }
}

/// Identifies one push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authoritative document store, as seen by the sync engine.
///
/// Implementations handle the wire protocol (HTTP, WebSocket, a vendor SDK).
/// Failures must be classified through [`RemoteErrorKind`] so the engine can
/// tell an offline device from a real error.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Read the user's record. `Ok(None)` when the server has none.
    async fn fetch(&self, user_id: &str) -> Result<Option<ProgressRecord>, RemoteError>;

    /// Overwrite the user's record.
    async fn write(&self, user_id: &str, record: &ProgressRecord) -> Result<(), RemoteError>;

    /// Start delivering every change to the user's record on `sender`.
    fn subscribe(&self, user_id: &str, sender: ChangeSender)
        -> Result<SubscriptionId, RemoteError>;

    /// Stop a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: &SubscriptionId);
}
