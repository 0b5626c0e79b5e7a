use crate::domain::{
    CongestionLevel, DomainError, DomainResult, InsertAlertRepoInput, InsertSampleRepoInput,
    RecentAverageSpeedRepoInput, RecentSamplesRepoInput, TelemetryStore, TrafficSample,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Row shape of `traffic_samples`
#[derive(Debug, Clone)]
pub struct TrafficSampleRow {
    pub id: i64,
    pub ts_utc: String,
    pub intersection_id: String,
    pub avg_speed: f64,
    pub vehicle_count: i64,
    pub congestion_score: f64,
    pub congestion_level: String,
    pub is_anomaly: i16,
}

impl TryFrom<TrafficSampleRow> for TrafficSample {
    type Error = DomainError;

    fn try_from(row: TrafficSampleRow) -> Result<Self, Self::Error> {
        let congestion_level = row
            .congestion_level
            .parse::<CongestionLevel>()
            .map_err(|e| DomainError::StoreReadError(anyhow::anyhow!(e)))?;

        Ok(TrafficSample {
            id: row.id,
            timestamp_utc: row.ts_utc,
            intersection_id: row.intersection_id,
            avg_speed_kmh: row.avg_speed,
            vehicle_count: row.vehicle_count,
            congestion_score: row.congestion_score,
            congestion_level,
            is_anomaly: row.is_anomaly != 0,
        })
    }
}

/// PostgreSQL implementation of TelemetryStore.
///
/// Inserts go through one async mutex shared by every clone, so sequence
/// values are handed out in commit order.
#[derive(Clone)]
pub struct PostgresTelemetryStore {
    client: PostgresClient,
    write_lock: Arc<Mutex<()>>,
}

impl PostgresTelemetryStore {
    pub fn new(client: PostgresClient) -> Self {
        Self {
            client,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn connection(&self) -> anyhow::Result<deadpool_postgres::Client> {
        self.client.get_connection().await
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl TelemetryStore for PostgresTelemetryStore {
    async fn insert_sample(&self, input: InsertSampleRepoInput) -> DomainResult<i64> {
        let _guard = self.write_lock.lock().await;

        let conn = self
            .connection()
            .await
            .map_err(DomainError::StoreWriteError)?;

        let level = input.congestion.level().as_str();
        let score = input.congestion.score();
        let is_anomaly: i16 = if input.is_anomaly { 1 } else { 0 };

        let row = conn
            .query_one(
                "INSERT INTO traffic_samples
                 (ts_utc, intersection_id, avg_speed, vehicle_count,
                  congestion_score, congestion_level, is_anomaly)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING id",
                &[
                    &input.timestamp_utc,
                    &input.intersection_id,
                    &input.avg_speed_kmh,
                    &input.vehicle_count,
                    &score,
                    &level,
                    &is_anomaly,
                ],
            )
            .await
            .map_err(|e| DomainError::StoreWriteError(e.into()))?;

        let id: i64 = row.get(0);
        debug!(sample_id = id, intersection_id = %input.intersection_id, "sample inserted");
        Ok(id)
    }

    async fn insert_alert(&self, input: InsertAlertRepoInput) -> DomainResult<i64> {
        let _guard = self.write_lock.lock().await;

        let conn = self
            .connection()
            .await
            .map_err(DomainError::StoreWriteError)?;

        let severity = input.severity.as_str();
        let row = conn
            .query_one(
                "INSERT INTO alerts (ts_utc, intersection_id, message, severity)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
                &[
                    &input.timestamp_utc,
                    &input.intersection_id,
                    &input.message,
                    &severity,
                ],
            )
            .await
            .map_err(|e| DomainError::StoreWriteError(e.into()))?;

        let id: i64 = row.get(0);
        debug!(alert_id = id, intersection_id = %input.intersection_id, "alert inserted");
        Ok(id)
    }

    async fn recent_average_speed(
        &self,
        input: RecentAverageSpeedRepoInput,
    ) -> DomainResult<Option<f64>> {
        let conn = self
            .connection()
            .await
            .map_err(DomainError::StoreReadError)?;

        let limit = limit_param(input.limit);
        let row = conn
            .query_one(
                "SELECT AVG(avg_speed) FROM (
                     SELECT avg_speed
                     FROM traffic_samples
                     WHERE intersection_id = $1
                     ORDER BY id DESC
                     LIMIT $2
                 ) AS recent",
                &[&input.intersection_id, &limit],
            )
            .await
            .map_err(|e| DomainError::StoreReadError(e.into()))?;

        Ok(row.get::<_, Option<f64>>(0))
    }

    async fn recent_samples(
        &self,
        input: RecentSamplesRepoInput,
    ) -> DomainResult<Vec<TrafficSample>> {
        let conn = self
            .connection()
            .await
            .map_err(DomainError::StoreReadError)?;

        let limit = limit_param(input.limit);
        let rows = conn
            .query(
                "SELECT id, ts_utc, intersection_id, avg_speed, vehicle_count,
                        congestion_score, congestion_level, is_anomaly
                 FROM (
                     SELECT *
                     FROM traffic_samples
                     WHERE intersection_id = $1
                     ORDER BY id DESC
                     LIMIT $2
                 ) AS recent
                 ORDER BY id ASC",
                &[&input.intersection_id, &limit],
            )
            .await
            .map_err(|e| DomainError::StoreReadError(e.into()))?;

        rows.into_iter()
            .map(|row| {
                TrafficSampleRow {
                    id: row.get(0),
                    ts_utc: row.get(1),
                    intersection_id: row.get(2),
                    avg_speed: row.get(3),
                    vehicle_count: row.get(4),
                    congestion_score: row.get(5),
                    congestion_level: row.get(6),
                    is_anomaly: row.get(7),
                }
                .try_into()
            })
            .collect()
    }
}
