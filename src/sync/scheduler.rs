//! Background sync scheduler — sweeps all connections on an interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::store::Database;
use crate::sync::SyncEngine;

/// Spawn a background task that periodically syncs every connection.
///
/// Returns a `JoinHandle` and a shutdown flag; set the flag to stop the
/// loop at the next tick. Connections are swept sequentially and a
/// per-connection failure never kills the loop (it is already recorded on
/// the connection row by the engine).
pub fn spawn_sync_scheduler(
    engine: Arc<SyncEngine>,
    db: Arc<dyn Database>,
    config: SyncConfig,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    // A zero interval disables scheduling; interval() panics on zero
    if !config.scheduler_enabled() {
        info!("Sync scheduler disabled (interval is 0)");
        let handle = tokio::spawn(async {});
        return (handle, shutdown_flag);
    }

    let handle = tokio::spawn(async move {
        info!(
            interval_secs = config.poll_interval_secs,
            "Sync scheduler started"
        );

        let mut tick = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
        // First tick fires after one full interval, not immediately
        tick.tick().await;

        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Sync scheduler shutting down");
                return;
            }

            sweep_once(&engine, &db).await;
        }
    });

    (handle, shutdown_flag)
}

/// One scheduler sweep: sync every known connection, sequentially.
async fn sweep_once(engine: &SyncEngine, db: &Arc<dyn Database>) {
    let connections = match db.list_connections().await {
        Ok(connections) => connections,
        Err(e) => {
            error!("Scheduler could not list connections: {e}");
            return;
        }
    };

    for connection in &connections {
        match engine.sync_connection(&connection.id).await {
            Ok(outcome) => {
                info!(
                    connection_id = %connection.id,
                    mailbox = %connection.mailbox_email,
                    threads = outcome.threads_synced,
                    "Scheduled sync finished"
                );
            }
            Err(e) => {
                warn!(
                    connection_id = %connection.id,
                    mailbox = %connection.mailbox_email,
                    "Scheduled sync failed: {e}"
                );
            }
        }
    }
}
