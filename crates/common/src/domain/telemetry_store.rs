use crate::domain::{
    DomainResult, InsertAlertRepoInput, InsertSampleRepoInput, RecentAverageSpeedRepoInput,
    RecentSamplesRepoInput, TrafficSample,
};
use async_trait::async_trait;

/// Append-only persistence for traffic samples and alerts.
///
/// Implementations must serialize writes so assigned ids are unique and
/// strictly increasing. Reads may lag a write issued by another task.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Append a sample and return its id
    async fn insert_sample(&self, input: InsertSampleRepoInput) -> DomainResult<i64>;

    /// Append an alert and return its id
    async fn insert_alert(&self, input: InsertAlertRepoInput) -> DomainResult<i64>;

    /// Mean speed over the newest `limit` samples, or `None` when there are none
    async fn recent_average_speed(
        &self,
        input: RecentAverageSpeedRepoInput,
    ) -> DomainResult<Option<f64>>;

    /// Newest `limit` samples, returned oldest first
    async fn recent_samples(&self, input: RecentSamplesRepoInput)
        -> DomainResult<Vec<TrafficSample>>;
}
