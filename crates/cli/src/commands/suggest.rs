use brewline_core::{SuggestionResolver, UserId};
use brewline_db::sql_stores;

use crate::commands::{application_failure, run_with_database, CommandResult, Success};

/// Resolves suggestions for `viewer`, or for a guest when none is given.
pub fn run(viewer: Option<String>) -> CommandResult {
    run_with_database("suggest", |config, pool| async move {
        let resolver = SuggestionResolver::new(sql_stores(&pool))
            .with_strategy_timeout(config.suggestions.strategy_timeout());
        let viewer = viewer.map(UserId);

        let outcome = resolver
            .get_suggestions(viewer.as_ref())
            .await
            .map_err(|error| application_failure("suggest", error))?;

        let ids =
            outcome.suggestions.iter().map(|product| product.id.as_str()).collect::<Vec<_>>();
        let audience = match &viewer {
            Some(user_id) => format!("user {user_id}"),
            None => "guest".to_string(),
        };
        Success::with_data(format!("{audience}: [{}]", ids.join(", ")), &outcome)
    })
}
