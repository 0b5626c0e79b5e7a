use crate::domain::{decode_telemetry, AnomalyDetector, TelemetryReading, TrafficProcessorConfig};
use common::domain::{
    AlertSeverity, CongestionLevel, CongestionScorer, DomainResult, InsertAlertRepoInput,
    InsertSampleRepoInput, TelemetryStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, instrument, warn};

type IntersectionLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// What one successfully ingested message produced
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub sample_id: i64,
    pub alert_id: Option<i64>,
    pub intersection_id: String,
    pub timestamp_utc: String,
    pub congestion_level: CongestionLevel,
    pub is_anomaly: bool,
    /// True when the history lookup failed and the anomaly flag fell back to false
    pub anomaly_check_degraded: bool,
}

/// Domain service that turns one telemetry message into stored rows
///
/// Flow:
/// 1. Decode the payload (malformed payloads write nothing)
/// 2. Score congestion from the average speed
/// 3. Check for a speed drop against the trailing window, before the insert
/// 4. Insert the sample
/// 5. Insert a High alert when the reading is anomalous
///
/// Messages for the same intersection are processed one at a time even when
/// several subscribers share this service. A lock entry only lives while some
/// message for its intersection is queued or in flight.
pub struct TelemetryIngestionService {
    store: Arc<dyn TelemetryStore>,
    scorer: CongestionScorer,
    detector: AnomalyDetector,
    intersection_locks: Arc<IntersectionLocks>,
}

impl TelemetryIngestionService {
    pub fn new(store: Arc<dyn TelemetryStore>, config: &TrafficProcessorConfig) -> Self {
        Self {
            scorer: CongestionScorer::new(config.free_flow_speed_kmh),
            detector: AnomalyDetector::new(
                Arc::clone(&store),
                config.anomaly_window,
                config.anomaly_drop_factor,
            ),
            store,
            intersection_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Decode and ingest one raw transport payload
    pub async fn on_message(&self, payload: &[u8]) -> DomainResult<IngestOutcome> {
        let reading = decode_telemetry(payload)?;
        self.ingest(reading).await
    }

    /// Score, check and persist one decoded reading
    #[instrument(
        name = "ingest_reading",
        skip_all,
        fields(
            intersection_id = %reading.intersection_id,
            timestamp_utc = %reading.timestamp_utc,
        )
    )]
    pub async fn ingest(&self, reading: TelemetryReading) -> DomainResult<IngestOutcome> {
        let _serialized = self.lock_intersection(&reading.intersection_id).await;

        let congestion = self.scorer.score(reading.avg_speed_kmh);
        let assessment = self
            .detector
            .check(&reading.intersection_id, reading.avg_speed_kmh)
            .await;

        let sample_id = self
            .store
            .insert_sample(InsertSampleRepoInput {
                timestamp_utc: reading.timestamp_utc.clone(),
                intersection_id: reading.intersection_id.clone(),
                avg_speed_kmh: reading.avg_speed_kmh,
                vehicle_count: reading.vehicle_count,
                congestion,
                is_anomaly: assessment.is_anomaly,
            })
            .await
            .inspect_err(|e| error!(error = %e, "failed to store traffic sample"))?;

        info!(
            sample_id,
            speed_kmh = reading.avg_speed_kmh,
            vehicle_count = reading.vehicle_count,
            congestion_score = congestion.score(),
            congestion_level = %congestion.level(),
            anomaly = assessment.is_anomaly,
            "traffic sample stored"
        );

        let alert_id = if assessment.is_anomaly {
            let message = slowdown_message(
                &reading.intersection_id,
                reading.avg_speed_kmh,
                assessment.recent_average_kmh,
            );
            let alert_id = self
                .store
                .insert_alert(InsertAlertRepoInput {
                    timestamp_utc: reading.timestamp_utc.clone(),
                    intersection_id: reading.intersection_id.clone(),
                    message: message.clone(),
                    severity: AlertSeverity::High,
                })
                .await
                .inspect_err(|e| error!(sample_id, error = %e, "failed to store alert"))?;
            warn!(alert_id, severity = %AlertSeverity::High, "ALERT: {}", message);
            Some(alert_id)
        } else {
            None
        };

        Ok(IngestOutcome {
            sample_id,
            alert_id,
            intersection_id: reading.intersection_id,
            timestamp_utc: reading.timestamp_utc,
            congestion_level: congestion.level(),
            is_anomaly: assessment.is_anomaly,
            anomaly_check_degraded: assessment.degraded,
        })
    }

    async fn lock_intersection(&self, intersection_id: &str) -> IntersectionLease {
        let lock = {
            let mut locks = self
                .intersection_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(intersection_id.to_string()).or_default())
        };

        // The lease exists before the await so a cancelled waiter still cleans up
        let mut lease = IntersectionLease {
            locks: Arc::clone(&self.intersection_locks),
            intersection_id: intersection_id.to_string(),
            lock: Arc::clone(&lock),
            guard: None,
        };
        lease.guard = Some(lock.lock_owned().await);
        lease
    }

    #[cfg(test)]
    fn tracked_intersections(&self) -> usize {
        self.intersection_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Holds one intersection's lock; the map entry is removed on drop when no
/// other message for that intersection is waiting.
struct IntersectionLease {
    locks: Arc<IntersectionLocks>,
    intersection_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IntersectionLease {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map and this lease still reference the lock
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.intersection_id);
        }
    }
}

fn slowdown_message(intersection_id: &str, speed_kmh: f64, recent_average: Option<f64>) -> String {
    match recent_average {
        Some(avg) => format!(
            "Sudden slowdown at {}: {:.1} km/h vs recent trend of {:.1} km/h.",
            intersection_id, speed_kmh, avg
        ),
        None => format!(
            "Sudden slowdown at {}: {:.1} km/h vs recent trend.",
            intersection_id, speed_kmh
        ),
    }
}
