//! Error types for the sync client.

use crate::remote::{RemoteError, RemoteErrorKind};
use tally_engine::UserId;

/// Everything that can go wrong in a sync session.
///
/// These never escape the public API as `Err`; they travel inside a
/// [`SyncOutcome`](crate::SyncOutcome).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("user not authenticated")]
    NotAuthenticated,

    #[error("no active sync session")]
    NotInitialized,

    #[error("no progress record on server for user {0}")]
    NotFound(UserId),

    #[error("remote unreachable: {0}")]
    Offline(String),

    #[error("remote error: {0}")]
    Remote(RemoteError),

    #[error("conflict left unresolved")]
    UnresolvedConflict,

    #[error("sync session stopped")]
    SessionStopped,

    #[error("engine error: {0}")]
    Engine(#[from] tally_engine::Error),
}

impl SyncError {
    /// True for failures caused by missing connectivity.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SyncError::Offline(_))
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err.kind {
            RemoteErrorKind::Connectivity => SyncError::Offline(err.message),
            _ => SyncError::Remote(err),
        }
    }
}

/// Result type for client operations that may fail internally.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::NotFound("user-1".into());
        assert_eq!(err.to_string(), "no progress record on server for user user-1");

        let err = SyncError::Offline("dns lookup failed".into());
        assert_eq!(err.to_string(), "remote unreachable: dns lookup failed");
    }

    #[test]
    fn remote_errors_are_classified_by_kind() {
        let err: SyncError = RemoteError::connectivity("timed out").into();
        assert_eq!(err, SyncError::Offline("timed out".into()));
        assert!(err.is_connectivity());

        // The message text plays no part in classification
        let err: SyncError = RemoteError::rejected("network policy denied write").into();
        assert!(matches!(err, SyncError::Remote(_)));
        assert!(!err.is_connectivity());
    }
}
