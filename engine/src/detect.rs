//! Conflict detection between two snapshots of the same record.
//!
//! Detection is a heuristic, not a causal check. Two snapshots conflict only
//! when their `lastModified` values are further apart than the threshold
//! *and* at least one of score, level, or inventory differs. Differences in
//! coins, gems, unlocked areas, or achievements alone never raise a conflict.

use crate::ProgressRecord;

/// Default tolerated skew between two `lastModified` values.
pub const DEFAULT_CONFLICT_THRESHOLD_MS: u64 = 1000;

/// Decides whether two snapshots diverge meaningfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDetector {
    threshold_ms: u64,
}

impl ConflictDetector {
    /// Create a detector with a custom skew threshold.
    pub fn new(threshold_ms: u64) -> Self {
        Self { threshold_ms }
    }

    /// The skew threshold in milliseconds.
    pub fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    /// Report whether `local` and `server` are in conflict.
    pub fn detect(&self, local: &ProgressRecord, server: &ProgressRecord) -> bool {
        let skew = local.last_modified.abs_diff(server.last_modified);
        if skew <= self.threshold_ms {
            return false;
        }

        local.score != server.score
            || local.level != server.level
            || local.inventory != server.inventory
    }

    /// List every top-level field that differs between the two snapshots.
    ///
    /// Purely diagnostic; it ignores the threshold and the criteria set.
    pub fn divergent_fields(local: &ProgressRecord, server: &ProgressRecord) -> Vec<&'static str> {
        let checks = [
            ("level", local.level != server.level),
            ("score", local.score != server.score),
            ("xp", local.xp != server.xp),
            ("coins", local.coins != server.coins),
            ("gems", local.gems != server.gems),
            ("lastModified", local.last_modified != server.last_modified),
            ("createdAt", local.created_at != server.created_at),
            ("inventory", local.inventory != server.inventory),
            ("unlockedAreas", local.unlocked_areas != server.unlocked_areas),
            ("achievements", local.achievements != server.achievements),
        ];

        checks
            .into_iter()
            .filter_map(|(name, differs)| differs.then_some(name))
            .collect()
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_THRESHOLD_MS)
    }
}
