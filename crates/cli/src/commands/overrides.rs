use brewline_core::{AdminOverrideService, OverrideType, ProductId, UserId};
use brewline_db::sql_stores;

use crate::commands::{application_failure, run_with_database, CommandResult, Success};

pub fn list() -> CommandResult {
    run_with_database("override", |_config, pool| async move {
        let overrides = AdminOverrideService::new(sql_stores(&pool))
            .list_user_overrides()
            .await
            .map_err(|error| application_failure("override", error))?;

        Success::with_data(format!("{} user overrides", overrides.len()), &overrides)
    })
}

pub fn set(user: String, product_ids: Vec<String>, override_type: OverrideType) -> CommandResult {
    run_with_database("override", |_config, pool| async move {
        let user_id = UserId(user);
        let product_ids = product_ids.into_iter().map(ProductId).collect::<Vec<_>>();
        let admin = AdminOverrideService::new(sql_stores(&pool));
        admin
            .set_user_override(&user_id, &product_ids, override_type)
            .await
            .map_err(|error| application_failure("override", error))?;

        let assigned = admin
            .list_user_overrides()
            .await
            .map_err(|error| application_failure("override", error))?
            .into_iter()
            .find(|view| view.user_id == user_id);
        Success::with_data(
            format!("{} override assigned to {user_id}", override_type.as_str()),
            &assigned,
        )
    })
}

/// Clearing a user without an override succeeds and reports that nothing changed.
pub fn clear(user: String) -> CommandResult {
    run_with_database("override", |_config, pool| async move {
        let user_id = UserId(user);
        let removed = AdminOverrideService::new(sql_stores(&pool))
            .clear_user_override(&user_id)
            .await
            .map_err(|error| application_failure("override", error))?;

        let message = if removed {
            format!("override cleared for {user_id}")
        } else {
            format!("no override set for {user_id}")
        };
        Success::with_data(message, serde_json::json!({ "userId": user_id, "removed": removed }))
    })
}
