//! In-process remote data source.
//!
//! Holds one record per user and fans changes out to subscribers, the way a
//! hosted document store would. Useful for tests, demos, and running several
//! "devices" against one authoritative copy inside a single process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tally_engine::{ProgressRecord, UserId};

use crate::remote::{ChangeSender, RemoteError, RemoteSource, SubscriptionId};

/// A registered push subscription.
#[derive(Debug)]
struct Subscriber {
    user_id: UserId,
    sender: ChangeSender,
}

/// Authoritative record store living in memory.
///
/// Thread-safe and can be shared across orchestrators via `Arc`.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    records: DashMap<UserId, ProgressRecord>,
    subscribers: DashMap<SubscriptionId, Subscriber>,
    offline: AtomicBool,
    reject_writes: AtomicBool,
    fetches: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryRemote {
    /// Create an empty remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty remote wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store a record directly, as another device would, notifying subscribers.
    pub fn put(&self, user_id: &str, record: ProgressRecord) {
        self.store(user_id, record);
    }

    /// Current stored record for a user.
    pub fn get(&self, user_id: &str) -> Option<ProgressRecord> {
        self.records.get(user_id).map(|r| r.clone())
    }

    /// Remove a user's record, notifying subscribers with `None`.
    pub fn remove(&self, user_id: &str) {
        if self.records.remove(user_id).is_some() {
            self.broadcast(user_id, None);
        }
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Make every write fail with a rejection.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of fetches served (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of writes attempted (including failed ones).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn store(&self, user_id: &str, record: ProgressRecord) {
        let previous = self.records.insert(user_id.to_string(), record.clone());
        if previous.as_ref() != Some(&record) {
            self.broadcast(user_id, Some(record));
        }
    }

    fn broadcast(&self, user_id: &str, change: Option<ProgressRecord>) {
        let mut sent_count = 0;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if subscriber.user_id != user_id {
                continue;
            }
            if subscriber.sender.send(change.clone()).is_ok() {
                sent_count += 1;
            } else {
                closed.push(entry.key().clone());
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
        }

        tracing::trace!(user_id = %user_id, recipients = sent_count, "Broadcast remote change");
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.is_offline() {
            return Err(RemoteError::connectivity("remote unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSource for MemoryRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<ProgressRecord>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.get(user_id))
    }

    async fn write(&self, user_id: &str, record: &ProgressRecord) -> Result<(), RemoteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::rejected("write rejected"));
        }
        self.store(user_id, record.clone());
        Ok(())
    }

    fn subscribe(
        &self,
        user_id: &str,
        sender: ChangeSender,
    ) -> Result<SubscriptionId, RemoteError> {
        let id = SubscriptionId::new();
        self.subscribers.insert(
            id.clone(),
            Subscriber {
                user_id: user_id.to_string(),
                sender,
            },
        );

        tracing::debug!(subscription = %id, user_id = %user_id, "Remote subscription registered");
        Ok(id)
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        if let Some((_, subscriber)) = self.subscribers.remove(id) {
            tracing::debug!(
                subscription = %id,
                user_id = %subscriber.user_id,
                "Remote subscription removed"
            );
        }
    }
}
