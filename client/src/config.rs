//! Configuration for sync sessions.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tally_engine::{ConflictDetector, ResolutionStrategy, DEFAULT_CONFLICT_THRESHOLD_MS};

/// Default prefix for local store scope keys.
pub const DEFAULT_SCOPE_PREFIX: &str = "progress_sync_";

/// Default capacity of a session's command queue.
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Sync session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Strategy used when a session is started without an explicit one
    pub strategy: ResolutionStrategy,
    /// Tolerated `lastModified` skew before content is compared
    pub conflict_threshold_ms: u64,
    /// Run a reconcile pass on this interval while a session is live
    pub sync_interval: Option<Duration>,
    /// Prefix for the local store key; the user id is appended
    pub scope_prefix: String,
    /// Directory for file-backed local snapshots
    pub store_dir: Option<PathBuf>,
    /// Capacity of the session command queue
    pub command_buffer: usize,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            strategy: ResolutionStrategy::default(),
            conflict_threshold_ms: DEFAULT_CONFLICT_THRESHOLD_MS,
            sync_interval: None,
            scope_prefix: DEFAULT_SCOPE_PREFIX.to_string(),
            store_dir: None,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }

    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_conflict_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.conflict_threshold_ms = threshold_ms;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    pub fn with_scope_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scope_prefix = prefix.into();
        self
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }

    /// Local store key for a user.
    pub fn scope_key(&self, user_id: &str) -> String {
        format!("{}{}", self.scope_prefix, user_id)
    }

    /// Conflict detector using the configured threshold.
    pub fn detector(&self) -> ConflictDetector {
        ConflictDetector::new(self.conflict_threshold_ms)
    }

    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(value) = lookup("TALLY_STRATEGY") {
            config.strategy = value
                .parse()
                .map_err(|_| ConfigError::InvalidStrategy(value))?;
        }

        if let Some(value) = lookup("TALLY_CONFLICT_THRESHOLD_MS") {
            config.conflict_threshold_ms = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidThreshold(value))?;
        }

        if let Some(value) = lookup("TALLY_SYNC_INTERVAL_SECS") {
            let secs: u64 = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidInterval(value.clone()))?;
            config.sync_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(value) = lookup("TALLY_SCOPE_PREFIX") {
            config.scope_prefix = value;
        }

        if let Some(value) = lookup("TALLY_STORE_DIR") {
            if !value.trim().is_empty() {
                config.store_dir = Some(PathBuf::from(value));
            }
        }

        if let Some(value) = lookup("TALLY_COMMAND_BUFFER") {
            let capacity: usize = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidCommandBuffer(value.clone()))?;
            if capacity == 0 {
                return Err(ConfigError::InvalidCommandBuffer(value));
            }
            config.command_buffer = capacity;
        }

        Ok(config)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration errors.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TALLY_STRATEGY value: {0}")]
    InvalidStrategy(String),

    #[error("Invalid TALLY_CONFLICT_THRESHOLD_MS value: {0}")]
    InvalidThreshold(String),

    #[error("Invalid TALLY_SYNC_INTERVAL_SECS value: {0}")]
    InvalidInterval(String),

    #[error("Invalid TALLY_COMMAND_BUFFER value: {0}")]
    InvalidCommandBuffer(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.strategy, ResolutionStrategy::Timestamp);
        assert_eq!(config.conflict_threshold_ms, 1000);
        assert_eq!(config.scope_key("u1"), "progress_sync_u1");
        assert_eq!(config.detector(), ConflictDetector::default());
    }

    #[test]
    fn from_lookup_reads_all_keys() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("TALLY_STRATEGY", "merge"),
            ("TALLY_CONFLICT_THRESHOLD_MS", "2500"),
            ("TALLY_SYNC_INTERVAL_SECS", "30"),
            ("TALLY_SCOPE_PREFIX", "save_"),
            ("TALLY_STORE_DIR", "/tmp/tally"),
            ("TALLY_COMMAND_BUFFER", "8"),
        ]))
        .unwrap();

        assert_eq!(config.strategy, ResolutionStrategy::Merge);
        assert_eq!(config.conflict_threshold_ms, 2500);
        assert_eq!(config.sync_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.scope_key("u1"), "save_u1");
        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/tally")));
        assert_eq!(config.command_buffer, 8);
    }

    #[test]
    fn zero_interval_disables_periodic_sync() {
        let config =
            SyncConfig::from_lookup(lookup(&[("TALLY_SYNC_INTERVAL_SECS", "0")])).unwrap();
        assert_eq!(config.sync_interval, None);
    }

    #[test]
    fn invalid_values() {
        assert_eq!(
            SyncConfig::from_lookup(lookup(&[("TALLY_STRATEGY", "coinflip")])),
            Err(ConfigError::InvalidStrategy("coinflip".into()))
        );
        assert_eq!(
            SyncConfig::from_lookup(lookup(&[("TALLY_CONFLICT_THRESHOLD_MS", "-1")])),
            Err(ConfigError::InvalidThreshold("-1".into()))
        );
        assert_eq!(
            SyncConfig::from_lookup(lookup(&[("TALLY_COMMAND_BUFFER", "0")])),
            Err(ConfigError::InvalidCommandBuffer("0".into()))
        );
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new()
            .with_strategy(ResolutionStrategy::ServerWins)
            .with_conflict_threshold_ms(0)
            .with_sync_interval(Duration::from_millis(50))
            .with_command_buffer(0);

        assert_eq!(config.strategy, ResolutionStrategy::ServerWins);
        assert_eq!(config.conflict_threshold_ms, 0);
        assert_eq!(config.sync_interval, Some(Duration::from_millis(50)));
        assert_eq!(config.command_buffer, 1);
    }
}
