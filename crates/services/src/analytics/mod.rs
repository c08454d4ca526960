//! Point-in-time reports over the full session collection.
//!
//! Every call re-reads the whole collection once and reduces it in memory;
//! nothing is cached or windowed at the storage level.

mod breakdown;
mod summary;

use std::sync::Arc;

use storage::repository::SessionRepository;

use crate::error::AggregationError;

pub use breakdown::{
    ActivatorActivity, DashboardBreakdown, DashboardFilter, DateWindow, EngagementCount,
    GenderSplit, Overview, RegionActivity, SchoolActivity, SessionTypeShare, WeeklyActivity,
    breakdown, percentage,
};
pub use summary::{AnalyticsSummary, RECENT_SESSIONS, summarize};

#[derive(Clone)]
pub struct AnalyticsService {
    sessions: Arc<dyn SessionRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// Headline totals, distinct counts and per-region counts.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError` if the collection cannot be read.
    pub async fn compute_summary(&self) -> Result<AnalyticsSummary, AggregationError> {
        let records = self.sessions.list_all().await.map_err(|err| {
            tracing::warn!(error = %err, "analytics fetch failed");
            AggregationError(err)
        })?;
        let summary = summarize(&records);
        tracing::debug!(
            sessions = summary.total_sessions,
            participants = summary.total_participants,
            "computed analytics summary"
        );
        Ok(summary)
    }

    /// Dashboard slices for the sessions `filter` selects.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError` if the collection cannot be read.
    pub async fn compute_breakdown(
        &self,
        filter: &DashboardFilter,
    ) -> Result<DashboardBreakdown, AggregationError> {
        let records = self.sessions.list_all().await.map_err(|err| {
            tracing::warn!(error = %err, "breakdown fetch failed");
            AggregationError(err)
        })?;
        Ok(breakdown(&records, filter))
    }
}
