use crate::domain::{
    Alert, DomainResult, InsertAlertRepoInput, InsertSampleRepoInput, RecentAverageSpeedRepoInput,
    RecentSamplesRepoInput, TelemetryStore, TrafficSample,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    samples: Vec<TrafficSample>,
    alerts: Vec<Alert>,
}

/// In-memory implementation of TelemetryStore.
///
/// Ids start at 1 per table and are assigned under the write lock.
#[derive(Clone, Default)]
pub struct InMemoryTelemetryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored sample in insertion order
    pub async fn samples(&self) -> Vec<TrafficSample> {
        self.tables.read().await.samples.clone()
    }

    /// Snapshot of every stored alert in insertion order
    pub async fn alerts(&self) -> Vec<Alert> {
        self.tables.read().await.alerts.clone()
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn insert_sample(&self, input: InsertSampleRepoInput) -> DomainResult<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.samples.len() as i64 + 1;
        tables.samples.push(input.into_sample(id));
        Ok(id)
    }

    async fn insert_alert(&self, input: InsertAlertRepoInput) -> DomainResult<i64> {
        let mut tables = self.tables.write().await;
        let id = tables.alerts.len() as i64 + 1;
        tables.alerts.push(input.into_alert(id));
        Ok(id)
    }

    async fn recent_average_speed(
        &self,
        input: RecentAverageSpeedRepoInput,
    ) -> DomainResult<Option<f64>> {
        let tables = self.tables.read().await;
        let speeds: Vec<f64> = tables
            .samples
            .iter()
            .rev()
            .filter(|s| s.intersection_id == input.intersection_id)
            .take(input.limit)
            .map(|s| s.avg_speed_kmh)
            .collect();

        if speeds.is_empty() {
            return Ok(None);
        }

        Ok(Some(speeds.iter().sum::<f64>() / speeds.len() as f64))
    }

    async fn recent_samples(
        &self,
        input: RecentSamplesRepoInput,
    ) -> DomainResult<Vec<TrafficSample>> {
        let tables = self.tables.read().await;
        let mut recent: Vec<TrafficSample> = tables
            .samples
            .iter()
            .rev()
            .filter(|s| s.intersection_id == input.intersection_id)
            .take(input.limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }
}
