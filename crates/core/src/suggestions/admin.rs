use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::policy::{
    validate_curated_ids, OverrideType, SettingsUpdate, SuggestionSettings,
};
use crate::domain::product::{Product, ProductId};
use crate::domain::user::UserId;
use crate::errors::{ApplicationError, DomainError};
use crate::suggestions::store::{resolve_in_order, SuggestionStores};

/// Curated defaults resolved to products, with the current settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsView {
    pub suggestions: Vec<Product>,
    pub settings: SuggestionSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverrideView {
    pub user_id: UserId,
    pub products: Vec<Product>,
    pub override_type: OverrideType,
    pub assigned_at: DateTime<Utc>,
}

/// Back-office edits to the suggestion policy.
///
/// Input is validated before the policy is loaded, so a rejected call leaves
/// the store untouched. Writes are load-modify-save with no version check.
#[derive(Clone)]
pub struct AdminOverrideService {
    stores: SuggestionStores,
}

impl AdminOverrideService {
    pub fn new(stores: SuggestionStores) -> Self {
        Self { stores }
    }

    pub async fn get_defaults(&self) -> Result<DefaultsView, ApplicationError> {
        let policy = self.stores.policy.load_or_init().await?;
        let suggestions =
            resolve_in_order(self.stores.catalog.as_ref(), &policy.ordered_default_ids()).await?;
        Ok(DefaultsView { suggestions, settings: policy.settings() })
    }

    pub async fn set_defaults(&self, product_ids: &[ProductId]) -> Result<(), ApplicationError> {
        let product_ids = validate_curated_ids(product_ids)?;

        let mut policy = self.stores.policy.load_or_init().await?;
        policy.replace_defaults(&product_ids, Utc::now())?;
        self.stores.policy.save(&policy).await?;

        info!(
            event_name = "suggestions.admin.defaults_set",
            count = product_ids.len(),
            "default suggestions replaced"
        );
        Ok(())
    }

    pub async fn list_user_overrides(&self) -> Result<Vec<UserOverrideView>, ApplicationError> {
        let policy = self.stores.policy.load_or_init().await?;

        let mut views = Vec::with_capacity(policy.user_overrides.len());
        for entry in policy.user_overrides {
            let products =
                resolve_in_order(self.stores.catalog.as_ref(), &entry.product_ids).await?;
            views.push(UserOverrideView {
                user_id: entry.user_id,
                products,
                override_type: entry.override_type,
                assigned_at: entry.assigned_at,
            });
        }
        Ok(views)
    }

    pub async fn set_user_override(
        &self,
        user_id: &UserId,
        product_ids: &[ProductId],
        override_type: OverrideType,
    ) -> Result<(), ApplicationError> {
        require_user(user_id)?;
        let product_ids = validate_curated_ids(product_ids)?;

        let mut policy = self.stores.policy.load_or_init().await?;
        policy.assign_override(user_id, &product_ids, override_type, Utc::now())?;
        self.stores.policy.save(&policy).await?;

        info!(
            event_name = "suggestions.admin.override_set",
            user_id = %user_id,
            override_type = override_type.as_str(),
            count = product_ids.len(),
            "user override assigned"
        );
        Ok(())
    }

    /// Removes the user's override if there is one. Returns whether anything
    /// was removed; clearing twice is not an error.
    pub async fn clear_user_override(&self, user_id: &UserId) -> Result<bool, ApplicationError> {
        require_user(user_id)?;

        let mut policy = self.stores.policy.load_or_init().await?;
        let removed = policy.clear_override(user_id, Utc::now());
        if removed {
            self.stores.policy.save(&policy).await?;
        }

        info!(
            event_name = "suggestions.admin.override_cleared",
            user_id = %user_id,
            removed,
            "user override cleared"
        );
        Ok(removed)
    }

    pub async fn get_settings(&self) -> Result<SuggestionSettings, ApplicationError> {
        Ok(self.stores.policy.load_or_init().await?.settings())
    }

    pub async fn set_settings(
        &self,
        update: SettingsUpdate,
    ) -> Result<SuggestionSettings, ApplicationError> {
        let mut policy = self.stores.policy.load_or_init().await?;
        let settings = policy.apply_settings(update, Utc::now());
        self.stores.policy.save(&policy).await?;

        info!(
            event_name = "suggestions.admin.settings_set",
            auto_enabled = settings.auto_enabled,
            auto_strategy = %settings.auto_strategy,
            "suggestion settings updated"
        );
        Ok(settings)
    }
}

fn require_user(user_id: &UserId) -> Result<(), DomainError> {
    if user_id.as_str().trim().is_empty() {
        return Err(DomainError::Validation("user id is required".to_string()));
    }
    Ok(())
}
