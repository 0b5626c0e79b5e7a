use crate::postgres::PostgresClient;
use anyhow::{Context, Result};
use tracing::info;

/// Idempotent DDL for the two append-only tables
pub const TELEMETRY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS traffic_samples (
    id BIGSERIAL PRIMARY KEY,
    ts_utc TEXT NOT NULL,
    intersection_id TEXT NOT NULL,
    avg_speed DOUBLE PRECISION NOT NULL,
    vehicle_count BIGINT NOT NULL,
    congestion_score DOUBLE PRECISION NOT NULL,
    congestion_level TEXT NOT NULL
        CHECK (congestion_level IN ('Green', 'Yellow', 'Orange', 'Red')),
    is_anomaly SMALLINT NOT NULL CHECK (is_anomaly IN (0, 1))
);

CREATE INDEX IF NOT EXISTS traffic_samples_intersection_id_idx
    ON traffic_samples (intersection_id, id DESC);

CREATE TABLE IF NOT EXISTS alerts (
    id BIGSERIAL PRIMARY KEY,
    ts_utc TEXT NOT NULL,
    intersection_id TEXT NOT NULL,
    message TEXT NOT NULL,
    severity TEXT NOT NULL
);
";

/// Create `traffic_samples` and `alerts` if they do not exist yet
pub async fn ensure_schema(client: &PostgresClient) -> Result<()> {
    let conn = client.get_connection().await?;
    conn.batch_execute(TELEMETRY_SCHEMA)
        .await
        .context("failed to create telemetry tables")?;
    info!("tables ensured (traffic_samples, alerts)");
    Ok(())
}
