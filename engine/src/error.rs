//! Error types for the Tally engine.

use crate::ItemId;
use thiserror::Error;

/// All possible errors from the Tally engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Record invariants
    #[error("duplicate inventory item: {0}")]
    DuplicateItem(ItemId),

    #[error("inventory item '{0}' has zero quantity")]
    ZeroQuantity(ItemId),

    #[error("duplicate unlocked area: {0}")]
    DuplicateArea(u32),

    #[error("duplicate achievement: {0}")]
    DuplicateAchievement(String),

    // Configuration
    #[error("unknown resolution strategy: {0}")]
    UnknownStrategy(String),

    // Serialization
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::DuplicateItem("sword".into());
        assert_eq!(err.to_string(), "duplicate inventory item: sword");

        let err = Error::ZeroQuantity("potion".into());
        assert_eq!(err.to_string(), "inventory item 'potion' has zero quantity");

        let err = Error::UnknownStrategy("coinflip".into());
        assert_eq!(err.to_string(), "unknown resolution strategy: coinflip");
    }
}
