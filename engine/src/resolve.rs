//! Conflict resolution strategies.
//!
//! A resolver turns two divergent snapshots into one reconciled snapshot.
//! Returning `None` means the conflict stays unresolved and is handed to the
//! application through the conflict listeners instead.

use crate::{error::Result, merge::merge_records, Error, ProgressRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolves a detected conflict between a local and a server snapshot.
pub trait Resolve: Send + Sync {
    /// Produce the reconciled snapshot, or `None` to leave the conflict open.
    fn resolve(&self, local: &ProgressRecord, server: &ProgressRecord) -> Option<ProgressRecord>;
}

/// Built-in resolution policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Server snapshot wins verbatim
    ServerWins,
    /// Local snapshot wins verbatim
    ClientWins,
    /// Newer `lastModified` wins, ties favor the server (default)
    #[default]
    Timestamp,
    /// Field-wise merge, see [`merge_records`]
    Merge,
}

impl ResolutionStrategy {
    /// All built-in strategies.
    pub const ALL: [ResolutionStrategy; 4] = [
        ResolutionStrategy::ServerWins,
        ResolutionStrategy::ClientWins,
        ResolutionStrategy::Timestamp,
        ResolutionStrategy::Merge,
    ];

    /// Configuration name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::ServerWins => "server-wins",
            ResolutionStrategy::ClientWins => "client-wins",
            ResolutionStrategy::Timestamp => "timestamp",
            ResolutionStrategy::Merge => "merge",
        }
    }
}

impl Resolve for ResolutionStrategy {
    fn resolve(&self, local: &ProgressRecord, server: &ProgressRecord) -> Option<ProgressRecord> {
        let resolved = match self {
            ResolutionStrategy::ServerWins => server.clone(),
            ResolutionStrategy::ClientWins => local.clone(),
            ResolutionStrategy::Timestamp => {
                if local.last_modified > server.last_modified {
                    local.clone()
                } else {
                    server.clone()
                }
            }
            ResolutionStrategy::Merge => merge_records(local, server),
        };
        Some(resolved)
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "server-wins" | "serverwins" | "server" => Ok(ResolutionStrategy::ServerWins),
            "client-wins" | "clientwins" | "client" => Ok(ResolutionStrategy::ClientWins),
            "timestamp" => Ok(ResolutionStrategy::Timestamp),
            "merge" => Ok(ResolutionStrategy::Merge),
            _ => Err(Error::UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConflictDetector, InventoryEntry};

    const T: u64 = 1_706_745_600_000;

    /// Local: score 100, acorn x2 found at T, modified at T.
    /// Server: score 150, acorn x1 found at T-500, modified at T+2000.
    fn divergent_pair() -> (ProgressRecord, ProgressRecord) {
        let mut local = ProgressRecord::new(T - 60_000);
        local.score = 100;
        local.level = 2;
        local.last_modified = T;
        local.inventory = vec![InventoryEntry::new("a", "Acorn", 1, 2, T)];

        let mut server = ProgressRecord::new(T - 60_000);
        server.score = 150;
        server.level = 2;
        server.last_modified = T + 2000;
        server.inventory = vec![InventoryEntry::new("a", "Acorn", 1, 1, T - 500)];

        (local, server)
    }

    #[test]
    fn merge_resolution_scenario() {
        let (local, server) = divergent_pair();
        assert!(ConflictDetector::default().detect(&local, &server));

        let resolved = ResolutionStrategy::Merge.resolve(&local, &server).unwrap();
        assert_eq!(resolved.score, 150);
        assert_eq!(resolved.level, 2);
        assert_eq!(
            resolved.inventory,
            vec![InventoryEntry::new("a", "Acorn", 1, 2, T - 500)]
        );
    }

    #[test]
    fn timestamp_resolution_scenario() {
        let (local, server) = divergent_pair();

        let resolved = ResolutionStrategy::Timestamp
            .resolve(&local, &server)
            .unwrap();
        assert_eq!(resolved, server);
        assert_eq!(resolved.inventory[0].quantity, 1);
    }

    #[test]
    fn timestamp_prefers_newer_local() {
        let (mut local, server) = divergent_pair();
        local.last_modified = T + 5000;

        let resolved = ResolutionStrategy::Timestamp
            .resolve(&local, &server)
            .unwrap();
        assert_eq!(resolved, local);
    }

    #[test]
    fn timestamp_tie_favors_server() {
        let (mut local, server) = divergent_pair();
        local.last_modified = server.last_modified;

        let resolved = ResolutionStrategy::Timestamp
            .resolve(&local, &server)
            .unwrap();
        assert_eq!(resolved, server);
    }

    #[test]
    fn verbatim_strategies() {
        let (local, server) = divergent_pair();

        assert_eq!(
            ResolutionStrategy::ServerWins.resolve(&local, &server),
            Some(server.clone())
        );
        assert_eq!(
            ResolutionStrategy::ClientWins.resolve(&local, &server),
            Some(local.clone())
        );
    }

    #[test]
    fn builtin_strategies_always_resolve() {
        let (local, server) = divergent_pair();
        for strategy in ResolutionStrategy::ALL {
            assert!(strategy.resolve(&local, &server).is_some(), "{strategy}");
        }
    }

    #[test]
    fn default_is_timestamp() {
        assert_eq!(ResolutionStrategy::default(), ResolutionStrategy::Timestamp);
    }

    #[test]
    fn parse_strategy_names() {
        for strategy in ResolutionStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<ResolutionStrategy>(), Ok(strategy));
        }
        assert_eq!(
            "SERVER_WINS".parse::<ResolutionStrategy>(),
            Ok(ResolutionStrategy::ServerWins)
        );
        assert_eq!(
            " Merge ".parse::<ResolutionStrategy>(),
            Ok(ResolutionStrategy::Merge)
        );
        assert_eq!(
            "coinflip".parse::<ResolutionStrategy>(),
            Err(Error::UnknownStrategy("coinflip".into()))
        );
    }

    #[test]
    fn serde_names_match_config_names() {
        let json = serde_json::to_string(&ResolutionStrategy::ClientWins).unwrap();
        assert_eq!(json, r#""client-wins""#);

        let parsed: ResolutionStrategy = serde_json::from_str(r#""server-wins""#).unwrap();
        assert_eq!(parsed, ResolutionStrategy::ServerWins);
    }
}
