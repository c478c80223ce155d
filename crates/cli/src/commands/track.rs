use brewline_core::{ProductId, SearchTracker, UserId};
use brewline_db::sql_stores;

use crate::commands::{application_failure, run_with_database, CommandResult, Success};

pub struct TrackArgs {
    pub user: Option<String>,
    pub query: String,
    pub tags: Vec<String>,
    pub product: Option<String>,
}

/// Records one storefront search in the search history log.
pub fn run(args: TrackArgs) -> CommandResult {
    run_with_database("track", |_config, pool| async move {
        let user = args.user.map(UserId);
        let entry = SearchTracker::new(sql_stores(&pool))
            .record_search(user.as_ref(), &args.query, &args.tags, args.product.map(ProductId))
            .await
            .map_err(|error| application_failure("track", error))?;

        Success::with_data(
            format!("search `{}` recorded for {}", entry.query, entry.user_id),
            &entry,
        )
    })
}
