//! Result type returned by every public orchestrator call.

use crate::error::SyncError;

/// What happened during a sync operation.
///
/// A connectivity failure is not a failure from the caller's point of view:
/// the outcome reports `success` with `is_offline` set and the mutation stays
/// in the local snapshot until the next reconcile pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncOutcome {
    pub success: bool,
    pub error: Option<SyncError>,
    /// The remote could not be reached
    pub is_offline: bool,
    /// A conflict was detected and the resolver left it open
    pub conflicted: bool,
}

impl SyncOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Recoverable connectivity failure.
    pub fn offline(error: SyncError) -> Self {
        Self {
            success: true,
            error: Some(error),
            is_offline: true,
            conflicted: false,
        }
    }

    pub fn failed(error: SyncError) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::default()
        }
    }

    /// The pass completed but a conflict is outstanding.
    pub fn unresolved() -> Self {
        Self {
            success: true,
            error: Some(SyncError::UnresolvedConflict),
            is_offline: false,
            conflicted: true,
        }
    }

    /// Classify an error: connectivity failures become offline outcomes.
    pub fn from_error(error: SyncError) -> Self {
        if error.is_connectivity() {
            Self::offline(error)
        } else {
            Self::failed(error)
        }
    }

    /// Succeeded with nothing outstanding.
    pub fn is_ok(&self) -> bool {
        self.success && self.error.is_none()
    }
}
