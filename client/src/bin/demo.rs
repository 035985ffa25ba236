//! Tally Demo - two devices syncing one player's progress.
//!
//! Both devices run their own orchestrator against a shared in-process
//! remote. They make concurrent edits, one of them drops offline for a
//! while, and every data-update and conflict event is logged.

use std::sync::Arc;
use std::time::Duration;

use tally_client::{
    FileStore, LocalStore, MemoryRemote, MemoryStore, SyncConfig, SyncOrchestrator, SyncOutcome,
};
use tally_engine::{InventoryEntry, ProgressRecord, ProgressUpdate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USER_ID: &str = "demo-player";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally_client=debug,tally_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env()?;
    tracing::info!(
        strategy = %config.strategy,
        threshold_ms = config.conflict_threshold_ms,
        "Starting Tally demo"
    );

    let remote = MemoryRemote::new_shared();
    remote.put(USER_ID, seed_record());

    let phone = device("phone", &remote, &config);
    let tablet = device("tablet", &remote, &config);

    report("phone", "initialize", &phone.initialize(USER_ID, None).await);
    report("tablet", "initialize", &tablet.initialize(USER_ID, None).await);

    // Let the clocks move past the conflict threshold
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (phone_outcome, tablet_outcome) = tokio::join!(
        phone.update_local_data(ProgressUpdate::new().with_score(120).with_coins(40)),
        tablet.update_local_data(
            ProgressUpdate::new()
                .with_level(2)
                .with_unlocked_areas(vec![1, 2])
        ),
    );
    report("phone", "update", &phone_outcome);
    report("tablet", "update", &tablet_outcome);

    tracing::info!("Phone loses connectivity");
    remote.set_offline(true);
    let outcome = phone
        .update_local_data(ProgressUpdate::new().with_score(300).with_achievements(vec![
            "first_blood".to_string(),
        ]))
        .await;
    report("phone", "offline update", &outcome);

    remote.set_offline(false);
    tracing::info!("Phone back online");
    report("phone", "reconcile", &phone.reconcile().await);

    // Pushes are delivered asynchronously
    tokio::time::sleep(Duration::from_millis(200)).await;

    for (name, sync) in [("phone", &phone), ("tablet", &tablet)] {
        if let Some(record) = sync.get_local_data() {
            tracing::info!(device = name, "Final local record:\n{}", record.to_json()?);
        }
    }
    if let Some(record) = remote.get(USER_ID) {
        tracing::info!("Final remote record:\n{}", serde_json::to_string_pretty(&record)?);
    }

    phone.stop();
    tablet.stop();
    Ok(())
}

fn seed_record() -> ProgressRecord {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let created = now.saturating_sub(60_000);

    let mut record = ProgressRecord::new(created);
    record.level = 1;
    record.score = 10;
    record
        .inventory
        .push(InventoryEntry::new("acorn", "Acorn", 1, 1, created));
    record
}

fn device(name: &'static str, remote: &Arc<MemoryRemote>, config: &SyncConfig) -> SyncOrchestrator {
    let store: Arc<dyn LocalStore> = match &config.store_dir {
        Some(dir) => Arc::new(FileStore::new(dir.join(name))),
        None => Arc::new(MemoryStore::new()),
    };

    let sync = SyncOrchestrator::new(remote.clone(), store, config.clone());

    sync.on_data_update(move |record| {
        tracing::info!(
            device = name,
            level = record.level,
            score = record.score,
            coins = record.coins,
            items = record.inventory.len(),
            "Data updated"
        );
    });

    sync.on_conflict(move |conflict| match serde_json::to_string(conflict) {
        Ok(json) => tracing::warn!(device = name, "Unresolved conflict: {}", json),
        Err(e) => tracing::error!(device = name, "Failed to serialize conflict: {}", e),
    });

    sync
}

fn report(device: &str, action: &str, outcome: &SyncOutcome) {
    match &outcome.error {
        None => tracing::info!(device, action, "ok"),
        Some(error) => tracing::info!(
            device,
            action,
            success = outcome.success,
            offline = outcome.is_offline,
            conflicted = outcome.conflicted,
            "{}",
            error
        ),
    }
}
