//! Session-scoped sync orchestrator.
//!
//! A [`SyncOrchestrator`] owns one user session at a time. Starting a session
//! spawns a single worker task that owns the local/server snapshot pair. Every
//! mutation source is turned into a message for that worker:
//!   - caller commands (`update_local_data`, `reconcile`, the initial pass)
//!   - remote pushes from the subscription
//!   - periodic ticks when a sync interval is configured
//!
//! The worker handles one message at a time, so a push-driven pass can never
//! interleave with a caller-driven one. When several sources are ready at
//! once the worker picks among them at random, so a busy caller cannot
//! starve pushes.
//!
//! The worker publishes copies of both snapshots into shared state after each
//! change; the getters only read that copy.
//!
//! Each session carries a liveness flag. `stop()` clears it under the state
//! lock, and the worker re-checks it after every suspension point. A pass
//! that was in flight when the session stopped therefore finishes without
//! touching the torn-down state or notifying anyone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tally_engine::{
    ConflictDetector, PersistedSnapshot, ProgressRecord, ProgressUpdate, Resolve,
    ResolutionStrategy, UserId,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::identity::{IdentityProvider, StaticIdentity};
use crate::notify::{ConflictRecord, ListenerHandle, Listeners};
use crate::outcome::SyncOutcome;
use crate::remote::{ChangeReceiver, RemoteSource, SubscriptionId};
use crate::store::LocalStore;

/// Published copy of the snapshot pair.
#[derive(Debug, Clone, Default)]
struct SyncState {
    local: Option<ProgressRecord>,
    server: Option<ProgressRecord>,
}

/// State shared between the orchestrator handle and its session worker.
struct Shared {
    state: RwLock<SyncState>,
    resolver: RwLock<Option<Arc<dyn Resolve>>>,
    data_listeners: Listeners<ProgressRecord>,
    conflict_listeners: Listeners<ConflictRecord>,
}

enum Command {
    Update {
        update: ProgressUpdate,
        reply: oneshot::Sender<SyncOutcome>,
    },
    Reconcile {
        reply: oneshot::Sender<SyncOutcome>,
    },
}

struct Session {
    user_id: UserId,
    alive: Arc<AtomicBool>,
    commands: mpsc::Sender<Command>,
    subscription: Option<SubscriptionId>,
}

/// Offline-first sync engine for one user's progress record.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tally_client::{MemoryRemote, MemoryStore, SyncConfig, SyncOrchestrator};
/// use tally_engine::{ProgressUpdate, ResolutionStrategy};
///
/// # async fn run() {
/// let remote = MemoryRemote::new_shared();
/// let store = Arc::new(MemoryStore::new());
/// let sync = SyncOrchestrator::new(remote, store, SyncConfig::default());
///
/// let _handle = sync.on_data_update(|record| println!("score is now {}", record.score));
///
/// sync.initialize("user-1", Some(ResolutionStrategy::Merge)).await;
/// let outcome = sync.update_local_data(ProgressUpdate::new().with_score(120)).await;
/// assert!(outcome.success);
/// # }
/// ```
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn LocalStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            store,
            identity: Arc::new(StaticIdentity::anonymous()),
            clock: Arc::new(SystemClock),
            config,
            shared: Arc::new(Shared {
                state: RwLock::new(SyncState::default()),
                resolver: RwLock::new(None),
                data_listeners: Listeners::new(),
                conflict_listeners: Listeners::new(),
            }),
            session: Mutex::new(None),
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Start a session for `user_id` and run the first reconcile pass.
    ///
    /// Any previous session is stopped first. `None` uses the configured
    /// default strategy. The returned outcome is that of the first pass; the
    /// session keeps running even when that pass failed.
    pub async fn initialize(
        &self,
        user_id: impl Into<UserId>,
        strategy: Option<ResolutionStrategy>,
    ) -> SyncOutcome {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return SyncOutcome::failed(SyncError::NotAuthenticated);
        }
        let strategy = strategy.unwrap_or(self.config.strategy);

        self.stop();

        let alive = Arc::new(AtomicBool::new(true));
        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        let subscription = match self.remote.subscribe(&user_id, change_tx) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Push subscription unavailable: {}", e);
                None
            }
        };

        let worker = SyncWorker {
            user_id: user_id.clone(),
            scope_key: self.config.scope_key(&user_id),
            strategy,
            detector: self.config.detector(),
            remote: Arc::clone(&self.remote),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            shared: Arc::clone(&self.shared),
            alive: Arc::clone(&alive),
            local: None,
            server: None,
            pending: Vec::new(),
        };
        tokio::spawn(worker.run(command_rx, change_rx, self.config.sync_interval));

        *self.session.lock() = Some(Session {
            user_id: user_id.clone(),
            alive,
            commands: command_tx,
            subscription,
        });

        tracing::info!(user_id = %user_id, strategy = %strategy, "Sync session started");

        self.request(|reply| Command::Reconcile { reply }).await
    }

    /// Start a session for the identity provider's current user.
    pub async fn initialize_current_user(
        &self,
        strategy: Option<ResolutionStrategy>,
    ) -> SyncOutcome {
        match self.identity.current_user_id() {
            Some(user_id) if !user_id.is_empty() => self.initialize(user_id, strategy).await,
            _ => {
                tracing::warn!("Cannot start sync session: no authenticated user");
                SyncOutcome::failed(SyncError::NotAuthenticated)
            }
        }
    }

    /// Close the subscription and clear in-memory state.
    ///
    /// A pass already waiting on I/O is not cancelled; when it completes its
    /// results are dropped.
    pub fn stop(&self) {
        let session = self.session.lock().take();
        let Some(session) = session else {
            return;
        };

        {
            let mut state = self.shared.state.write();
            session.alive.store(false, Ordering::SeqCst);
            *state = SyncState::default();
        }

        if let Some(id) = &session.subscription {
            self.remote.unsubscribe(id);
        }

        tracing::info!(user_id = %session.user_id, "Sync session stopped");
    }

    /// Apply a partial update to the local snapshot, persist it, then reconcile.
    ///
    /// Reports success while offline; the update is kept locally until a
    /// later pass reaches the remote. Without any local snapshot yet, the
    /// update is queued and replayed onto the first server snapshot.
    pub async fn update_local_data(&self, update: ProgressUpdate) -> SyncOutcome {
        self.request(|reply| Command::Update { update, reply }).await
    }

    /// Run one reconcile pass against the remote.
    pub async fn reconcile(&self) -> SyncOutcome {
        self.request(|reply| Command::Reconcile { reply }).await
    }

    pub fn get_local_data(&self) -> Option<ProgressRecord> {
        self.shared.state.read().local.clone()
    }

    /// Last snapshot observed from the remote.
    pub fn get_server_data(&self) -> Option<ProgressRecord> {
        self.shared.state.read().server.clone()
    }

    /// Called with the new local snapshot after each reconcile that adopts one.
    pub fn on_data_update(
        &self,
        listener: impl Fn(&ProgressRecord) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.data_listeners.add(listener)
    }

    /// Called when a detected conflict is left unresolved.
    pub fn on_conflict(
        &self,
        listener: impl Fn(&ConflictRecord) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.shared.conflict_listeners.add(listener)
    }

    /// Resolve conflicts with `resolver` instead of the session strategy.
    ///
    /// Applies to the running session and to later ones.
    pub fn set_resolver(&self, resolver: Arc<dyn Resolve>) {
        *self.shared.resolver.write() = Some(resolver);
    }

    /// Go back to resolving with the session strategy.
    pub fn clear_resolver(&self) {
        *self.shared.resolver.write() = None;
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_some()
    }

    /// User of the running session.
    pub fn user_id(&self) -> Option<UserId> {
        self.session.lock().as_ref().map(|s| s.user_id.clone())
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<SyncOutcome>) -> Command,
    ) -> SyncOutcome {
        let commands = match self.session.lock().as_ref() {
            Some(session) => session.commands.clone(),
            None => return SyncOutcome::failed(SyncError::NotInitialized),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if commands.send(command(reply_tx)).await.is_err() {
            return SyncOutcome::failed(SyncError::SessionStopped);
        }

        reply_rx
            .await
            .unwrap_or_else(|_| SyncOutcome::failed(SyncError::SessionStopped))
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Session worker
// ============================================================================

/// Where a server snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Read by this worker during a reconcile pass
    Fetched,
    /// Delivered by the push subscription
    Pushed,
}

struct SyncWorker {
    user_id: UserId,
    scope_key: String,
    strategy: ResolutionStrategy,
    detector: ConflictDetector,
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    shared: Arc<Shared>,
    alive: Arc<AtomicBool>,
    local: Option<ProgressRecord>,
    server: Option<ProgressRecord>,
    /// Updates made offline before any local snapshot existed
    pending: Vec<ProgressUpdate>,
}

impl SyncWorker {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut changes: ChangeReceiver,
        sync_interval: Option<Duration>,
    ) {
        self.restore().await;

        let mut ticker = sync_interval
            .filter(|period| !period.is_zero())
            .map(|period| {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });
        let mut changes_open = true;

        while self.is_alive() {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },

                change = changes.recv(), if changes_open => match change {
                    Some(Some(record)) => self.handle_push(record).await,
                    Some(None) => {
                        tracing::warn!(
                            user_id = %self.user_id,
                            "Remote record removed; keeping local snapshot"
                        );
                    }
                    None => {
                        changes_open = false;
                        tracing::debug!(user_id = %self.user_id, "Push subscription closed");
                    }
                },

                _ = next_tick(&mut ticker) => {
                    let outcome = self.reconcile_pass().await;
                    tracing::debug!(
                        user_id = %self.user_id,
                        success = outcome.success,
                        offline = outcome.is_offline,
                        "Periodic reconcile finished"
                    );
                }
            }
        }

        tracing::debug!(user_id = %self.user_id, "Sync worker exited");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Update { update, reply } => {
                let outcome = self.update_local(update).await;
                let _ = reply.send(outcome);
            }
            Command::Reconcile { reply } => {
                let outcome = self.reconcile_pass().await;
                let _ = reply.send(outcome);
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Load the persisted local snapshot, if any.
    async fn restore(&mut self) {
        match self.store.load(&self.scope_key).await {
            Ok(Some(snapshot)) => {
                if !self.is_alive() {
                    return;
                }
                tracing::info!(
                    user_id = %self.user_id,
                    captured_at = snapshot.captured_at,
                    "Restored local snapshot"
                );
                self.local = Some(snapshot.record);
                self.publish();
            }
            Ok(None) => {
                tracing::debug!(user_id = %self.user_id, "No local snapshot to restore");
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, "Failed to load local snapshot: {}", e);
            }
        }
    }

    async fn update_local(&mut self, update: ProgressUpdate) -> SyncOutcome {
        if self.local.is_none() {
            match self.fetch().await {
                Ok(server) => {
                    let mut local = server.clone();
                    self.replay_pending(&mut local);
                    self.server = Some(server);
                    self.local = Some(local);
                }
                Err(e @ SyncError::Offline(_)) => {
                    self.pending.push(update);
                    tracing::info!(
                        user_id = %self.user_id,
                        queued = self.pending.len(),
                        "No local snapshot yet, update queued"
                    );
                    return self.fetch_failed(e);
                }
                Err(e) => return self.fetch_failed(e),
            }
        }

        let now = self.clock.now_millis();
        if let Some(local) = self.local.as_mut() {
            local.apply_update(&update, now);
        }
        tracing::debug!(user_id = %self.user_id, last_modified = now, "Applied local update");

        self.publish();
        self.persist().await;
        if !self.is_alive() {
            return SyncOutcome::failed(SyncError::SessionStopped);
        }

        self.reconcile_pass().await
    }

    /// Fetch the server snapshot and reconcile the local one against it.
    async fn reconcile_pass(&mut self) -> SyncOutcome {
        let server = match self.fetch().await {
            Ok(server) => server,
            Err(e) => return self.fetch_failed(e),
        };

        match self.local.clone() {
            Some(local) => self.apply_server(local, server, Source::Fetched).await,
            None => self.adopt_first(server).await,
        }
    }

    /// First server snapshot of a session without a local one.
    ///
    /// Queued updates are replayed on top of it and the result goes through
    /// a regular fetched pass, so it reaches the remote.
    async fn adopt_first(&mut self, server: ProgressRecord) -> SyncOutcome {
        let mut local = server.clone();
        if !self.replay_pending(&mut local) {
            tracing::info!(user_id = %self.user_id, "Adopting server snapshot");
            self.server = Some(server);
            self.local = Some(local);
            self.commit().await;
            return SyncOutcome::ok();
        }

        self.local = Some(local.clone());
        self.publish();
        self.persist().await;
        if !self.is_alive() {
            return SyncOutcome::failed(SyncError::SessionStopped);
        }
        self.apply_server(local, server, Source::Fetched).await
    }

    /// Apply queued updates to `record`. False when there were none.
    fn replay_pending(&mut self, record: &mut ProgressRecord) -> bool {
        if self.pending.is_empty() {
            return false;
        }

        let now = self.clock.now_millis();
        let count = self.pending.len();
        for update in self.pending.drain(..) {
            record.apply_update(&update, now);
        }
        tracing::info!(user_id = %self.user_id, count, "Replayed queued updates");
        true
    }

    async fn handle_push(&mut self, mut server: ProgressRecord) {
        server.normalize();
        tracing::debug!(
            user_id = %self.user_id,
            last_modified = server.last_modified,
            "Remote change received"
        );

        let outcome = match self.local.clone() {
            Some(local) => self.apply_server(local, server, Source::Pushed).await,
            None => self.adopt_first(server).await,
        };

        if !outcome.is_ok() {
            tracing::debug!(
                user_id = %self.user_id,
                success = outcome.success,
                offline = outcome.is_offline,
                conflicted = outcome.conflicted,
                "Push-driven reconcile finished with issues"
            );
        }
    }

    /// Run detection and the matching branch for one server snapshot.
    async fn apply_server(
        &mut self,
        local: ProgressRecord,
        server: ProgressRecord,
        source: Source,
    ) -> SyncOutcome {
        self.server = Some(server.clone());

        if !self.detector.detect(&local, &server) {
            return self.adopt_server(local, server, source).await;
        }

        match self.resolve(&local, &server) {
            Some(resolved) => self.adopt_resolved(resolved, server, source).await,
            None => self.report_conflict(local, server),
        }
    }

    fn resolve(&self, local: &ProgressRecord, server: &ProgressRecord) -> Option<ProgressRecord> {
        let custom = self.shared.resolver.read().clone();
        match custom {
            Some(resolver) => resolver.resolve(local, server),
            None => self.strategy.resolve(local, server),
        }
    }

    /// No conflict: the server snapshot becomes the local one.
    ///
    /// A fetched pass writes local to the remote first when the two differ.
    /// A pushed snapshot is adopted as is.
    async fn adopt_server(
        &mut self,
        local: ProgressRecord,
        server: ProgressRecord,
        source: Source,
    ) -> SyncOutcome {
        let changed = local != server;

        if source == Source::Fetched && changed {
            if let Err(e) = self.write(&local).await {
                return self.write_failed(e);
            }
        }

        tracing::debug!(
            user_id = %self.user_id,
            conflict = false,
            changed,
            ?source,
            "Reconciled without conflict"
        );

        self.local = Some(server);
        if source == Source::Pushed && !changed {
            self.publish();
            return SyncOutcome::ok();
        }
        self.commit().await;
        SyncOutcome::ok()
    }

    async fn adopt_resolved(
        &mut self,
        resolved: ProgressRecord,
        server: ProgressRecord,
        source: Source,
    ) -> SyncOutcome {
        tracing::info!(
            user_id = %self.user_id,
            conflict = true,
            strategy = %self.strategy,
            ?source,
            "Conflict resolved"
        );

        self.local = Some(resolved.clone());

        let mut outcome = SyncOutcome::ok();
        if source == Source::Fetched || resolved != server {
            match self.write(&resolved).await {
                Ok(()) => self.server = Some(resolved),
                Err(SyncError::SessionStopped) => {
                    return SyncOutcome::failed(SyncError::SessionStopped)
                }
                Err(e) => outcome = self.write_failed(e),
            }
        }

        self.commit().await;
        outcome
    }

    fn report_conflict(&self, local: ProgressRecord, server: ProgressRecord) -> SyncOutcome {
        let divergent_fields = ConflictDetector::divergent_fields(&local, &server);
        tracing::warn!(
            user_id = %self.user_id,
            conflict = true,
            fields = ?divergent_fields,
            "Conflict left unresolved"
        );

        let conflict = ConflictRecord {
            local_snapshot: local,
            server_snapshot: server,
            detected_at: self.clock.now_millis(),
            divergent_fields,
        };

        if self.publish() {
            self.shared.conflict_listeners.emit(&conflict);
        }
        SyncOutcome::unresolved()
    }

    async fn fetch(&self) -> Result<ProgressRecord, SyncError> {
        let fetched = self.remote.fetch(&self.user_id).await;
        if !self.is_alive() {
            return Err(SyncError::SessionStopped);
        }

        match fetched? {
            Some(mut record) => {
                record.normalize();
                Ok(record)
            }
            None => Err(SyncError::NotFound(self.user_id.clone())),
        }
    }

    async fn write(&self, record: &ProgressRecord) -> Result<(), SyncError> {
        let written = self.remote.write(&self.user_id, record).await;
        if !self.is_alive() {
            return Err(SyncError::SessionStopped);
        }
        written.map_err(SyncError::from)
    }

    fn fetch_failed(&self, error: SyncError) -> SyncOutcome {
        match &error {
            SyncError::Offline(_) => {
                tracing::info!(
                    user_id = %self.user_id,
                    offline = true,
                    "Remote unreachable, keeping local snapshot: {}",
                    error
                );
            }
            SyncError::SessionStopped => {
                tracing::debug!(user_id = %self.user_id, "Dropping fetch result of stopped session");
            }
            _ => {
                tracing::warn!(user_id = %self.user_id, "Fetch failed: {}", error);
            }
        }
        SyncOutcome::from_error(error)
    }

    fn write_failed(&self, error: SyncError) -> SyncOutcome {
        match &error {
            SyncError::Offline(_) => {
                tracing::info!(
                    user_id = %self.user_id,
                    offline = true,
                    "Remote unreachable, write deferred: {}",
                    error
                );
            }
            SyncError::SessionStopped => {
                tracing::debug!(user_id = %self.user_id, "Dropping write result of stopped session");
            }
            _ => {
                tracing::warn!(user_id = %self.user_id, "Write failed: {}", error);
            }
        }
        SyncOutcome::from_error(error)
    }

    /// Publish, persist and announce the current local snapshot.
    async fn commit(&self) {
        if !self.publish() {
            return;
        }
        self.persist().await;
        if !self.is_alive() {
            return;
        }
        if let Some(record) = &self.local {
            self.shared.data_listeners.emit(record);
        }
    }

    /// Copy the snapshot pair into shared state. False once the session stopped.
    fn publish(&self) -> bool {
        let mut state = self.shared.state.write();
        if !self.is_alive() {
            return false;
        }
        state.local = self.local.clone();
        state.server = self.server.clone();
        true
    }

    async fn persist(&self) {
        let Some(record) = &self.local else {
            return;
        };
        if !self.is_alive() {
            return;
        }

        let snapshot = PersistedSnapshot::new(record.clone(), self.clock.now_millis());
        if let Err(e) = self.store.save(&self.scope_key, &snapshot).await {
            tracing::warn!(user_id = %self.user_id, "Failed to persist local snapshot: {}", e);
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryRemote;
    use crate::store::MemoryStore;

    const T: u64 = 1_706_745_600_000;

    fn record(score: u64, last_modified: u64) -> ProgressRecord {
        let mut r = ProgressRecord::new(T - 86_400_000);
        r.score = score;
        r.last_modified = last_modified;
        r
    }

    fn orchestrator(remote: Arc<MemoryRemote>, store: Arc<MemoryStore>) -> SyncOrchestrator {
        SyncOrchestrator::new(remote, store, SyncConfig::default())
            .with_clock(Arc::new(ManualClock::new(T + 10_000)))
    }

    #[tokio::test]
    async fn requests_without_session() {
        let sync = orchestrator(MemoryRemote::new_shared(), Arc::new(MemoryStore::new()));

        let outcome = sync.reconcile().await;
        assert_eq!(outcome.error, Some(SyncError::NotInitialized));
        assert!(!outcome.success);
        assert!(!sync.is_running());
        assert_eq!(sync.get_local_data(), None);
    }

    #[tokio::test]
    async fn initialize_adopts_server_snapshot() {
        let remote = MemoryRemote::new_shared();
        remote.put("u1", record(40, T));
        let store = Arc::new(MemoryStore::new());
        let sync = orchestrator(remote.clone(), store.clone());

        let outcome = sync.initialize("u1", None).await;
        assert!(outcome.is_ok());
        assert!(sync.is_running());
        assert_eq!(sync.user_id().as_deref(), Some("u1"));
        assert_eq!(sync.get_local_data(), Some(record(40, T)));
        assert_eq!(sync.get_server_data(), Some(record(40, T)));
        assert!(store.contains("progress_sync_u1"));
        assert_eq!(remote.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn stop_clears_state_and_subscription() {
        let remote = MemoryRemote::new_shared();
        remote.put("u1", record(40, T));
        let sync = orchestrator(remote.clone(), Arc::new(MemoryStore::new()));

        sync.initialize("u1", None).await;
        sync.stop();

        assert!(!sync.is_running());
        assert_eq!(sync.get_local_data(), None);
        assert_eq!(sync.get_server_data(), None);
        assert_eq!(remote.subscriber_count(), 0);
        assert_eq!(
            sync.reconcile().await.error,
            Some(SyncError::NotInitialized)
        );

        // Idempotent
        sync.stop();
    }

    #[tokio::test]
    async fn empty_user_id_is_not_authenticated() {
        let sync = orchestrator(MemoryRemote::new_shared(), Arc::new(MemoryStore::new()));
        let outcome = sync.initialize("", None).await;
        assert_eq!(outcome.error, Some(SyncError::NotAuthenticated));
        assert!(!sync.is_running());
    }

    #[tokio::test]
    async fn reinitialize_replaces_session() {
        let remote = MemoryRemote::new_shared();
        remote.put("u1", record(1, T));
        remote.put("u2", record(2, T));
        let sync = orchestrator(remote.clone(), Arc::new(MemoryStore::new()));

        sync.initialize("u1", None).await;
        sync.initialize("u2", None).await;

        assert_eq!(sync.user_id().as_deref(), Some("u2"));
        assert_eq!(sync.get_local_data().map(|r| r.score), Some(2));
        assert_eq!(remote.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn next_tick_without_interval_never_fires() {
        let mut ticker = None;
        let fired = tokio::time::timeout(Duration::from_millis(20), next_tick(&mut ticker)).await;
        assert!(fired.is_err());
    }
}
