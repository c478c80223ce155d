//! Admin-curated suggestion policy: global defaults, per-user overrides and
//! the automatic strategy settings. A single policy record exists per store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

/// Defaults and overrides must name at least this many products.
pub const MIN_CURATED_PRODUCTS: usize = 3;

/// Automatic suggestion source used when a viewer has no override.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoStrategy {
    OrderHistory,
    SearchHistory,
    Related,
    #[default]
    Hybrid,
}

impl AutoStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderHistory => "orderHistory",
            Self::SearchHistory => "searchHistory",
            Self::Related => "related",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for AutoStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AutoStrategy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "orderhistory" => Ok(Self::OrderHistory),
            "searchhistory" => Ok(Self::SearchHistory),
            "related" => Ok(Self::Related),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(DomainError::Validation(format!(
                "unsupported auto strategy `{other}` (expected orderHistory|searchHistory|related|hybrid)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideType {
    #[default]
    Manual,
    Auto,
}

impl OverrideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl std::str::FromStr for OverrideType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "auto" => Ok(Self::Auto),
            other => Err(DomainError::Validation(format!(
                "unsupported override type `{other}` (expected manual|auto)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSuggestion {
    pub product_id: ProductId,
    pub display_order: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOverride {
    pub user_id: UserId,
    pub product_ids: Vec<ProductId>,
    pub override_type: OverrideType,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSettings {
    pub auto_enabled: bool,
    pub auto_strategy: AutoStrategy,
}

/// Partial settings update; `None` leaves the field unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub auto_enabled: Option<bool>,
    pub auto_strategy: Option<AutoStrategy>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionPolicy {
    pub default_suggestions: Vec<DefaultSuggestion>,
    pub user_overrides: Vec<UserOverride>,
    pub auto_enabled: bool,
    pub auto_strategy: AutoStrategy,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        Self {
            default_suggestions: Vec::new(),
            user_overrides: Vec::new(),
            auto_enabled: true,
            auto_strategy: AutoStrategy::Hybrid,
            updated_at: None,
        }
    }
}

impl SuggestionPolicy {
    /// Default product ids sorted by `display_order`.
    pub fn ordered_default_ids(&self) -> Vec<ProductId> {
        let mut defaults = self.default_suggestions.iter().collect::<Vec<_>>();
        defaults.sort_by_key(|entry| entry.display_order);
        defaults.into_iter().map(|entry| entry.product_id.clone()).collect()
    }

    pub fn override_for(&self, user_id: &UserId) -> Option<&UserOverride> {
        self.user_overrides.iter().find(|entry| &entry.user_id == user_id)
    }

    pub fn settings(&self) -> SuggestionSettings {
        SuggestionSettings { auto_enabled: self.auto_enabled, auto_strategy: self.auto_strategy }
    }

    /// Replaces the whole default list; position becomes `display_order`.
    pub fn replace_defaults(
        &mut self,
        product_ids: &[ProductId],
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let product_ids = validate_curated_ids(product_ids)?;
        self.default_suggestions = product_ids
            .into_iter()
            .enumerate()
            .map(|(index, product_id)| DefaultSuggestion {
                product_id,
                display_order: index as u32,
            })
            .collect();
        self.updated_at = Some(now);
        Ok(())
    }

    /// Drops any previous override for the user and appends the new one.
    pub fn assign_override(
        &mut self,
        user_id: &UserId,
        product_ids: &[ProductId],
        override_type: OverrideType,
        now: DateTime<Utc>,
    ) -> Result<&UserOverride, DomainError> {
        if user_id.as_str().trim().is_empty() {
            return Err(DomainError::Validation("user id is required".to_string()));
        }
        let product_ids = validate_curated_ids(product_ids)?;

        self.user_overrides.retain(|entry| &entry.user_id != user_id);
        self.user_overrides.push(UserOverride {
            user_id: user_id.clone(),
            product_ids,
            override_type,
            assigned_at: now,
        });
        self.updated_at = Some(now);

        let index = self.user_overrides.len() - 1;
        Ok(&self.user_overrides[index])
    }

    /// Returns whether an override was removed. Removing an absent override is not an error.
    pub fn clear_override(&mut self, user_id: &UserId, now: DateTime<Utc>) -> bool {
        let before = self.user_overrides.len();
        self.user_overrides.retain(|entry| &entry.user_id != user_id);
        let removed = self.user_overrides.len() != before;
        if removed {
            self.updated_at = Some(now);
        }
        removed
    }

    pub fn apply_settings(
        &mut self,
        update: SettingsUpdate,
        now: DateTime<Utc>,
    ) -> SuggestionSettings {
        if let Some(auto_enabled) = update.auto_enabled {
            self.auto_enabled = auto_enabled;
        }
        if let Some(auto_strategy) = update.auto_strategy {
            self.auto_strategy = auto_strategy;
        }
        self.updated_at = Some(now);
        self.settings()
    }
}

/// Checks an admin-curated id list. Blank ids are rejected, repeats are
/// collapsed to their first position, and at least
/// [`MIN_CURATED_PRODUCTS`] distinct ids must remain.
pub fn validate_curated_ids(product_ids: &[ProductId]) -> Result<Vec<ProductId>, DomainError> {
    if product_ids.iter().any(|id| id.as_str().trim().is_empty()) {
        return Err(DomainError::Validation("product ids must not be blank".to_string()));
    }

    let mut seen = HashSet::new();
    let distinct = product_ids
        .iter()
        .filter(|id| seen.insert(id.as_str().trim().to_string()))
        .map(|id| ProductId(id.as_str().trim().to_string()))
        .collect::<Vec<_>>();

    if distinct.len() < MIN_CURATED_PRODUCTS {
        return Err(DomainError::Validation(format!(
            "at least {MIN_CURATED_PRODUCTS} distinct product ids are required, got {}",
            distinct.len()
        )));
    }

    Ok(distinct)
}
