//! Background upkeep: expiry sweeps and database backups, each on its own
//! interval and independent of request traffic.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::EventStore;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub purge_interval: Duration,
    pub backup_interval: Duration,
    pub backup_path: PathBuf,
}

/// Starts the upkeep loop. It exits once `shutdown` changes or its sender is
/// dropped.
pub fn spawn(
    store: EventStore,
    config: MaintenanceConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut purge_ticker = tokio::time::interval(config.purge_interval);
        purge_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut backup_ticker = tokio::time::interval(config.backup_interval);
        backup_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = purge_ticker.tick() => {
                    match store.purge_expired().await {
                        Ok(0) => tracing::debug!("no expired events"),
                        Ok(count) => tracing::info!(count, "purged expired events"),
                        Err(e) => tracing::error!(error = %e, "expired event purge failed"),
                    }
                }
                _ = backup_ticker.tick() => {
                    match store.snapshot_to(&config.backup_path).await {
                        Ok(()) => tracing::info!(
                            path = %config.backup_path.display(),
                            "database backed up"
                        ),
                        Err(e) => tracing::error!(error = %e, "database backup failed"),
                    }
                }
                _ = shutdown.changed() => {
                    tracing::debug!("maintenance: shutdown requested");
                    break;
                }
            }
        }

        tracing::debug!("maintenance loop exited");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEvent;
    use crate::words::Wordlist;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn first_ticks_purge_and_back_up_then_shutdown_stops_loop() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("main.db").display());
        let store = EventStore::open(&url, Wordlist::builtin(), 366).await?;
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let expired = store
            .create_event(NewEvent {
                description: None,
                first_day: day,
                last_day: day,
                start_time: None,
                end_time: None,
                ttl_seconds: -10,
            })
            .await?;

        let backup_path = dir.path().join("backup.db");
        let (tx, rx) = watch::channel(false);
        let handle = spawn(
            store.clone(),
            MaintenanceConfig {
                purge_interval: Duration::from_secs(3600),
                backup_interval: Duration::from_secs(3600),
                backup_path: backup_path.clone(),
            },
            rx,
        );

        // Both intervals fire immediately on their first tick.
        for _ in 0..100 {
            if backup_path.exists() && store.get_event(&expired.id).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(backup_path.exists());
        assert!(store.get_event(&expired.id).await.is_err());

        tx.send(true)?;
        tokio::time::timeout(Duration::from_secs(5), handle).await??;
        Ok(())
    }
}
