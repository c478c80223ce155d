use brewline_core::{AdminOverrideService, SettingsUpdate};
use brewline_db::sql_stores;

use crate::commands::{application_failure, run_with_database, CommandResult, Success};

pub fn show() -> CommandResult {
    run_with_database("settings", |_config, pool| async move {
        let settings = AdminOverrideService::new(sql_stores(&pool))
            .get_settings()
            .await
            .map_err(|error| application_failure("settings", error))?;

        Success::with_data(format!("auto strategy {}", settings.auto_strategy), &settings)
    })
}

/// Applies a partial update; omitted fields keep their stored value.
pub fn set(update: SettingsUpdate) -> CommandResult {
    run_with_database("settings", |_config, pool| async move {
        let settings = AdminOverrideService::new(sql_stores(&pool))
            .set_settings(update)
            .await
            .map_err(|error| application_failure("settings", error))?;

        Success::with_data("suggestion settings updated", &settings)
    })
}
