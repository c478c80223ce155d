use std::time::Duration;

use brewline_db::repositories::{RepositoryError, SqlSearchHistoryLog};
use brewline_db::DbPool;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Deletes expired search history on a fixed interval until `shutdown`
/// flips to `true`. The first sweep runs immediately.
pub fn spawn(
    db_pool: DbPool,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let log = SqlSearchHistoryLog::new(db_pool);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            event_name = "system.sweeper.start",
            correlation_id = "bootstrap",
            interval_secs = interval.as_secs(),
            "search history sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are retried on the next tick.
                    let _ = sweep_once(&log).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            event_name = "system.sweeper.stopped",
            correlation_id = "shutdown",
            "search history sweeper stopped"
        );
    })
}

pub async fn sweep_once(log: &SqlSearchHistoryLog) -> Result<u64, RepositoryError> {
    match log.purge_expired(Utc::now()).await {
        Ok(purged) => {
            info!(
                event_name = "suggestions.search_history.purged",
                correlation_id = "sweeper",
                purged,
                "expired search history purged"
            );
            Ok(purged)
        }
        Err(error) => {
            warn!(
                event_name = "suggestions.search_history.purge_failed",
                correlation_id = "sweeper",
                error = %error,
                "search history purge failed"
            );
            Err(error)
        }
    }
}
