use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::domain::policy::SuggestionPolicy;
use crate::domain::product::Product;
use crate::domain::user::UserId;
use crate::errors::ApplicationError;
use crate::suggestions::store::{resolve_in_order, SuggestionStores};
use crate::suggestions::strategy::merge_distinct;
use crate::suggestions::{DEFAULT_STRATEGY_TIMEOUT, MAX_SUGGESTIONS};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionOutcome {
    pub suggestions: Vec<Product>,
    pub is_personalized: bool,
}

/// Where a resolved suggestion list came from, for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SuggestionSource {
    GuestDefaults,
    Override,
    Defaults,
    Strategy,
}

impl SuggestionSource {
    fn as_str(&self) -> &'static str {
        match self {
            Self::GuestDefaults => "guest_defaults",
            Self::Override => "override",
            Self::Defaults => "defaults",
            Self::Strategy => "strategy",
        }
    }
}

/// Decides which products a viewer sees. Every call reads the current
/// store state; nothing is cached between calls.
#[derive(Clone)]
pub struct SuggestionResolver {
    stores: SuggestionStores,
    strategy_timeout: Duration,
}

impl SuggestionResolver {
    pub fn new(stores: SuggestionStores) -> Self {
        Self { stores, strategy_timeout: DEFAULT_STRATEGY_TIMEOUT }
    }

    pub fn with_strategy_timeout(mut self, timeout: Duration) -> Self {
        self.strategy_timeout = timeout;
        self
    }

    /// Resolves up to [`MAX_SUGGESTIONS`] distinct products for `viewer`
    /// (`None` for guests).
    ///
    /// Fails only when the policy or catalog store cannot be read.
    pub async fn get_suggestions(
        &self,
        viewer: Option<&UserId>,
    ) -> Result<SuggestionOutcome, ApplicationError> {
        let policy = self.stores.policy.load_or_init().await?;
        let viewer = viewer.filter(|user| !user.as_str().trim().is_empty());

        let (suggestions, source) = match viewer {
            None => (self.resolve_defaults(&policy).await?, SuggestionSource::GuestDefaults),
            Some(user_id) => self.resolve_for_user(&policy, user_id).await?,
        };
        let suggestions = merge_distinct([suggestions], MAX_SUGGESTIONS);

        info!(
            event_name = "suggestions.resolve.completed",
            user_id = viewer.map(UserId::as_str).unwrap_or("guest"),
            source = source.as_str(),
            auto_enabled = policy.auto_enabled,
            auto_strategy = %policy.auto_strategy,
            count = suggestions.len(),
            "suggestions resolved"
        );

        Ok(SuggestionOutcome { suggestions, is_personalized: viewer.is_some() })
    }

    async fn resolve_for_user(
        &self,
        policy: &SuggestionPolicy,
        user_id: &UserId,
    ) -> Result<(Vec<Product>, SuggestionSource), ApplicationError> {
        let manual = policy.override_for(user_id);

        if manual.is_some() || !policy.auto_enabled {
            return match manual.filter(|entry| !entry.product_ids.is_empty()) {
                Some(entry) => {
                    let products =
                        resolve_in_order(self.stores.catalog.as_ref(), &entry.product_ids).await?;
                    Ok((products, SuggestionSource::Override))
                }
                None => Ok((self.resolve_defaults(policy).await?, SuggestionSource::Defaults)),
            };
        }

        let candidates =
            policy.auto_strategy.run(&self.stores, user_id, self.strategy_timeout).await;
        if candidates.len() >= MAX_SUGGESTIONS {
            return Ok((candidates, SuggestionSource::Strategy));
        }

        let defaults = self.resolve_defaults(policy).await?;
        Ok((merge_distinct([candidates, defaults], MAX_SUGGESTIONS), SuggestionSource::Strategy))
    }

    async fn resolve_defaults(
        &self,
        policy: &SuggestionPolicy,
    ) -> Result<Vec<Product>, ApplicationError> {
        let products =
            resolve_in_order(self.stores.catalog.as_ref(), &policy.ordered_default_ids()).await?;
        Ok(merge_distinct([products], MAX_SUGGESTIONS))
    }
}
