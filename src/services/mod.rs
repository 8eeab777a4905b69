pub mod alert_service;
pub mod catalog_service;
pub mod notification_service;

pub use alert_service::{AlertService, PriceAlert};
pub use catalog_service::{CatalogService, Pack, Set};
pub use notification_service::{DiscordNotifier, DispatchOutcome, Notifier};
