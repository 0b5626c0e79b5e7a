use chrono::{SecondsFormat, Utc};
use common::domain::{DomainError, DomainResult};
use serde_json::{Map, Value};

/// Intersection assumed when a payload omits `intersection_id`
pub const DEFAULT_INTERSECTION_ID: &str = "intersection1";

/// Telemetry fields extracted from one inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReading {
    pub intersection_id: String,
    pub timestamp_utc: String,
    pub avg_speed_kmh: f64,
    pub vehicle_count: i64,
}

/// Decode a JSON telemetry document.
///
/// Only a payload that is not UTF-8 JSON or not an object is rejected. Missing
/// or unusable fields fall back to defaults; a missing timestamp is replaced
/// with the receipt time. Negative speeds are read as 0. Unknown keys are
/// ignored.
pub fn decode_telemetry(payload: &[u8]) -> DomainResult<TelemetryReading> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| DomainError::PayloadDecodeError(format!("payload is not UTF-8: {}", e)))?;

    let value: Value = serde_json::from_str(text)
        .map_err(|e| DomainError::PayloadDecodeError(format!("invalid JSON: {}", e)))?;

    let Value::Object(fields) = value else {
        return Err(DomainError::PayloadDecodeError(
            "payload must be a JSON object".to_string(),
        ));
    };

    Ok(TelemetryReading {
        intersection_id: string_field(&fields, "intersection_id")
            .unwrap_or_else(|| DEFAULT_INTERSECTION_ID.to_string()),
        timestamp_utc: string_field(&fields, "timestamp_utc").unwrap_or_else(receipt_timestamp),
        avg_speed_kmh: speed_field(&fields, "avg_speed_kmh").unwrap_or(0.0),
        vehicle_count: count_field(&fields, "vehicle_count").unwrap_or(0),
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key)?.as_str().map(str::to_string)
}

fn speed_field(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let speed = match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    speed.is_finite().then_some(speed.max(0.0))
}

fn count_field(fields: &Map<String, Value>, key: &str) -> Option<i64> {
    let count = match fields.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }?;
    (count >= 0).then_some(count)
}

fn receipt_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
