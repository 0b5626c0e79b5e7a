use common::domain::{DomainResult, RecentAverageSpeedRepoInput, TelemetryStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of comparing one reading against the trailing window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyAssessment {
    pub is_anomaly: bool,
    /// Mean speed of the trailing window, `None` on a cold store
    pub recent_average_kmh: Option<f64>,
    /// History could not be read; the reading was treated as normal
    pub degraded: bool,
}

impl AnomalyAssessment {
    fn no_history() -> Self {
        Self {
            is_anomaly: false,
            recent_average_kmh: None,
            degraded: false,
        }
    }

    fn history_unavailable() -> Self {
        Self {
            degraded: true,
            ..Self::no_history()
        }
    }
}

/// Flags sudden speed drops relative to the most recent samples of an
/// intersection. Must run before the current reading is stored.
pub struct AnomalyDetector {
    store: Arc<dyn TelemetryStore>,
    window: usize,
    drop_factor: f64,
}

impl AnomalyDetector {
    pub fn new(store: Arc<dyn TelemetryStore>, window: usize, drop_factor: f64) -> Self {
        Self {
            store,
            window,
            drop_factor,
        }
    }

    /// Compare `current_speed_kmh` with the trailing mean.
    ///
    /// Store read failures are returned; [`AnomalyDetector::check`] is the
    /// variant that falls back instead.
    pub async fn assess(
        &self,
        intersection_id: &str,
        current_speed_kmh: f64,
    ) -> DomainResult<AnomalyAssessment> {
        let recent_average = self
            .store
            .recent_average_speed(RecentAverageSpeedRepoInput {
                intersection_id: intersection_id.to_string(),
                limit: self.window,
            })
            .await?;

        let Some(recent_average) = recent_average.filter(|avg| *avg > 0.0) else {
            debug!(intersection_id, "no usable speed history, skipping anomaly check");
            return Ok(AnomalyAssessment::no_history());
        };

        let threshold = self.drop_factor * recent_average;
        Ok(AnomalyAssessment {
            is_anomaly: current_speed_kmh < threshold,
            recent_average_kmh: Some(recent_average),
            degraded: false,
        })
    }

    /// Like [`assess`](Self::assess) but never fails: a store read error is
    /// logged and reported as a degraded "no anomaly".
    pub async fn check(&self, intersection_id: &str, current_speed_kmh: f64) -> AnomalyAssessment {
        match self.assess(intersection_id, current_speed_kmh).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(
                    intersection_id,
                    error = %e,
                    "anomaly history unavailable, treating reading as normal"
                );
                AnomalyAssessment::history_unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{DomainError, MockTelemetryStore};

    fn detector_with_average(average: Option<f64>) -> AnomalyDetector {
        let mut store = MockTelemetryStore::new();
        store
            .expect_recent_average_speed()
            .withf(|input: &RecentAverageSpeedRepoInput| {
                input.intersection_id == "intersection1" && input.limit == 20
            })
            .returning(move |_| Ok(average));
        AnomalyDetector::new(Arc::new(store), 20, 0.6)
    }

    #[tokio::test]
    async fn test_cold_store_is_never_anomalous() {
        let detector = detector_with_average(None);
        for speed in [0.0, 1.0, 100.0] {
            let assessment = detector.assess("intersection1", speed).await.unwrap();
            assert!(!assessment.is_anomaly);
            assert_eq!(assessment.recent_average_kmh, None);
        }
    }

    #[tokio::test]
    async fn test_non_positive_mean_is_never_anomalous() {
        let detector = detector_with_average(Some(0.0));
        let assessment = detector.check("intersection1", 0.0).await;
        assert!(!assessment.is_anomaly);
        assert!(!assessment.degraded);
    }

    #[tokio::test]
    async fn test_drop_below_threshold_is_anomalous() {
        let detector = detector_with_average(Some(50.0));
        let assessment = detector.assess("intersection1", 29.9).await.unwrap();
        assert!(assessment.is_anomaly);
        assert_eq!(assessment.recent_average_kmh, Some(50.0));
    }

    #[tokio::test]
    async fn test_threshold_equality_is_not_anomalous() {
        // 0.6 * 50.0 == 30.0 exactly
        let detector = detector_with_average(Some(50.0));
        assert!(!detector.check("intersection1", 30.0).await.is_anomaly);
        assert!(!detector.check("intersection1", 45.0).await.is_anomaly);
    }

    #[tokio::test]
    async fn test_store_failure_falls_back_to_no_anomaly() {
        let mut store = MockTelemetryStore::new();
        store.expect_recent_average_speed().returning(|_| {
            Err(DomainError::StoreReadError(anyhow::anyhow!(
                "connection refused"
            )))
        });
        let detector = AnomalyDetector::new(Arc::new(store), 20, 0.6);

        assert!(matches!(
            detector.assess("intersection1", 1.0).await,
            Err(DomainError::StoreReadError(_))
        ));
        let assessment = detector.check("intersection1", 1.0).await;
        assert!(!assessment.is_anomaly);
        assert!(assessment.degraded);
        assert_eq!(assessment.recent_average_kmh, None);
    }
}
