#![forbid(unsafe_code)]

pub mod analytics;
pub mod app_services;
pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod session_store;

#[cfg(test)]
mod test_support;

pub use activator_core::Clock;

pub use analytics::{AnalyticsService, AnalyticsSummary, DashboardBreakdown, DashboardFilter};
pub use app_services::AppServices;
pub use config::AppConfig;
pub use error::{
    AggregationError, AppServicesError, ConfigError, ExportError, FeedError, SubmitError,
};
pub use feed::{FeedHandle, FeedUpdate, SessionChange, SessionFeed};
pub use session_store::SessionStore;
pub use storage::repository::SessionScope;
