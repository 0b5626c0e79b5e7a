use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert severity. Speed-drop anomalies are always raised as `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::High => "High",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted alert raised by an anomalous sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub timestamp_utc: String,
    pub intersection_id: String,
    pub message: String,
    pub severity: AlertSeverity,
}

/// Input for appending an alert (id is assigned by the store)
#[derive(Debug, Clone, PartialEq)]
pub struct InsertAlertRepoInput {
    pub timestamp_utc: String,
    pub intersection_id: String,
    pub message: String,
    pub severity: AlertSeverity,
}

impl InsertAlertRepoInput {
    pub fn into_alert(self, id: i64) -> Alert {
        Alert {
            id,
            timestamp_utc: self.timestamp_utc,
            intersection_id: self.intersection_id,
            message: self.message,
            severity: self.severity,
        }
    }
}
