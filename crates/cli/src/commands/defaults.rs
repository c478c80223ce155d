use brewline_core::{AdminOverrideService, ProductId};
use brewline_db::sql_stores;

use crate::commands::{application_failure, run_with_database, CommandResult, Success};

pub fn show() -> CommandResult {
    run_with_database("defaults", |_config, pool| async move {
        let view = AdminOverrideService::new(sql_stores(&pool))
            .get_defaults()
            .await
            .map_err(|error| application_failure("defaults", error))?;

        let message = format!(
            "{} default suggestions, auto {} ({})",
            view.suggestions.len(),
            if view.settings.auto_enabled { "enabled" } else { "disabled" },
            view.settings.auto_strategy
        );
        Success::with_data(message, &view)
    })
}

/// Replaces the curated default list; the order given becomes display order.
pub fn set(product_ids: Vec<String>) -> CommandResult {
    run_with_database("defaults", |_config, pool| async move {
        let product_ids = product_ids.into_iter().map(ProductId).collect::<Vec<_>>();
        let admin = AdminOverrideService::new(sql_stores(&pool));
        admin
            .set_defaults(&product_ids)
            .await
            .map_err(|error| application_failure("defaults", error))?;

        let view =
            admin.get_defaults().await.map_err(|error| application_failure("defaults", error))?;
        Success::with_data("default suggestions replaced", &view)
    })
}
