use common::domain::{DomainError, DomainResult, DEFAULT_FREE_FLOW_SPEED_KMH};
use serde::{Deserialize, Serialize};

/// Tunables for congestion scoring and speed-drop detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficProcessorConfig {
    /// Free-flow baseline in km/h (default: 50.0)
    pub free_flow_speed_kmh: f64,

    /// Number of most recent samples in the trailing window (default: 20)
    pub anomaly_window: usize,

    /// Fraction of the trailing mean below which a reading is anomalous (default: 0.6)
    pub anomaly_drop_factor: f64,
}

impl Default for TrafficProcessorConfig {
    fn default() -> Self {
        Self {
            free_flow_speed_kmh: DEFAULT_FREE_FLOW_SPEED_KMH,
            anomaly_window: 20,
            anomaly_drop_factor: 0.6,
        }
    }
}

impl TrafficProcessorConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if !self.free_flow_speed_kmh.is_finite() || self.free_flow_speed_kmh < 0.0 {
            return Err(DomainError::InvalidProcessorConfig(format!(
                "free_flow_speed_kmh must be a finite, non-negative number, got {}",
                self.free_flow_speed_kmh
            )));
        }
        if self.anomaly_window == 0 {
            return Err(DomainError::InvalidProcessorConfig(
                "anomaly_window must be at least 1".to_string(),
            ));
        }
        if !self.anomaly_drop_factor.is_finite() || self.anomaly_drop_factor <= 0.0 {
            return Err(DomainError::InvalidProcessorConfig(format!(
                "anomaly_drop_factor must be positive, got {}",
                self.anomaly_drop_factor
            )));
        }
        Ok(())
    }
}
