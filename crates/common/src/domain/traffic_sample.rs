use crate::domain::{CongestionAssessment, CongestionLevel};
use serde::{Deserialize, Serialize};

/// Persisted traffic observation for one intersection and interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub id: i64,
    pub timestamp_utc: String,
    pub intersection_id: String,
    pub avg_speed_kmh: f64,
    pub vehicle_count: i64,
    pub congestion_score: f64,
    pub congestion_level: CongestionLevel,
    pub is_anomaly: bool,
}

/// Input for appending a sample (id is assigned by the store)
#[derive(Debug, Clone, PartialEq)]
pub struct InsertSampleRepoInput {
    pub timestamp_utc: String,
    pub intersection_id: String,
    pub avg_speed_kmh: f64,
    pub vehicle_count: i64,
    pub congestion: CongestionAssessment,
    pub is_anomaly: bool,
}

impl InsertSampleRepoInput {
    /// Materialize the stored row once the store has assigned an id
    pub fn into_sample(self, id: i64) -> TrafficSample {
        TrafficSample {
            id,
            timestamp_utc: self.timestamp_utc,
            intersection_id: self.intersection_id,
            avg_speed_kmh: self.avg_speed_kmh,
            vehicle_count: self.vehicle_count,
            congestion_score: self.congestion.score(),
            congestion_level: self.congestion.level(),
            is_anomaly: self.is_anomaly,
        }
    }
}

/// Input for the trailing-window average query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentAverageSpeedRepoInput {
    pub intersection_id: String,
    pub limit: usize,
}

/// Input for the downstream "latest N samples" read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSamplesRepoInput {
    pub intersection_id: String,
    pub limit: usize,
}
