pub mod config;
pub mod domain;
pub mod errors;
pub mod suggestions;

pub use domain::order::{Order, OrderId, OrderItem, OrderItemType};
pub use domain::policy::{
    AutoStrategy, DefaultSuggestion, OverrideType, SettingsUpdate, SuggestionPolicy,
    SuggestionSettings, UserOverride,
};
pub use domain::product::{Product, ProductId};
pub use domain::search::{SearchHistoryEntry, SearchHistoryId};
pub use domain::user::UserId;
pub use errors::{ApplicationError, DomainError, InterfaceError, StoreError};
pub use suggestions::{
    AdminOverrideService, SearchTracker, SuggestionOutcome, SuggestionResolver, SuggestionStores,
};
