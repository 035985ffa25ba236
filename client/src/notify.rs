//! Listener registration and fault-isolated dispatch.
//!
//! Listeners are stored as `Arc<dyn Fn(&T)>` so the list can be snapshotted
//! cheaply before each dispatch:
//!   - A listener removed during dispatch is still called in that round.
//!   - A listener added during dispatch is not called until the next one.
//!
//! Dispatch is synchronous and follows registration order. A listener that
//! panics is logged and skipped; the remaining listeners still run.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tally_engine::{ProgressRecord, Timestamp};

/// Identifies a registered listener.
pub type ListenerId = u64;

/// Closure type for listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

/// A conflict the resolver left open.
///
/// Exists only for the duration of one dispatch; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub local_snapshot: ProgressRecord,
    pub server_snapshot: ProgressRecord,
    pub detected_at: Timestamp,
    /// Top-level fields that differ between the two snapshots
    pub divergent_fields: Vec<&'static str>,
}

struct Registry<T> {
    listeners: Mutex<Vec<(ListenerId, Arc<ListenerFn<T>>)>>,
    next_id: AtomicU64,
}

trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId);
}

impl<T> Detach for Registry<T> {
    fn detach(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }
}

/// An ordered list of listeners for one event type.
///
/// Cloning yields another handle to the same list.
pub struct Listeners<T> {
    registry: Arc<Registry<T>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `callback`; the returned handle removes it again.
    pub fn add(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerHandle {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.lock().push((id, Arc::new(callback)));

        let registry: Arc<dyn Detach> = self.registry.clone();
        ListenerHandle {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    /// Remove a listener by id. Unknown ids are ignored.
    pub fn remove(&self, id: ListenerId) {
        self.registry.detach(id);
    }

    /// Call every listener with `event`, in registration order.
    ///
    /// Returns the number of listeners that panicked.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<(ListenerId, Arc<ListenerFn<T>>)> = {
            let guard = self.registry.listeners.lock();
            guard.iter().map(|(id, cb)| (*id, Arc::clone(cb))).collect()
        };

        let mut failures = 0;
        for (id, cb) in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| cb(event))) {
                failures += 1;
                tracing::error!(
                    listener_id = id,
                    "Listener panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.registry.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// De-registration handle returned when a listener is added.
///
/// Dropping the handle leaves the listener registered.
#[derive(Clone)]
pub struct ListenerHandle {
    id: ListenerId,
    registry: Weak<dyn Detach>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}
