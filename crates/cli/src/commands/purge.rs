use brewline_db::repositories::SqlSearchHistoryLog;
use chrono::Utc;

use crate::commands::{run_with_database, CommandResult, Failure, Success};

/// Deletes search history entries past their expiry.
pub fn run() -> CommandResult {
    run_with_database("purge-history", |_config, pool| async move {
        let purged = SqlSearchHistoryLog::new(pool)
            .purge_expired(Utc::now())
            .await
            .map_err(|error| ("persistence", error.to_string(), 8u8))?;

        Ok::<_, Failure>(Success::message(format!(
            "purged {purged} expired search history entries"
        )))
    })
}
