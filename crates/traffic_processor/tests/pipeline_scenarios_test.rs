use common::domain::{
    AlertSeverity, CongestionLevel, InMemoryTelemetryStore, RecentSamplesRepoInput,
    TelemetryStore,
};
use std::sync::Arc;
use traffic_processor::domain::{TelemetryIngestionService, TrafficProcessorConfig};

fn pipeline() -> (InMemoryTelemetryStore, TelemetryIngestionService) {
    let store = InMemoryTelemetryStore::new();
    let shared: Arc<dyn TelemetryStore> = Arc::new(store.clone());
    let service = TelemetryIngestionService::new(shared, &TrafficProcessorConfig::default());
    (store, service)
}

fn payload(intersection_id: &str, minute: u32, avg_speed_kmh: f64, vehicle_count: i64) -> Vec<u8> {
    serde_json::json!({
        "intersection_id": intersection_id,
        "timestamp_utc": format!("2025-05-04T10:{:02}:00+00:00", minute),
        "avg_speed_kmh": avg_speed_kmh,
        "vehicle_count": vehicle_count,
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn test_sudden_slowdown_after_steady_history_raises_one_alert() {
    let (store, service) = pipeline();

    for minute in 0..20 {
        service
            .on_message(&payload("intersection1", minute, 50.0, 10))
            .await
            .unwrap();
    }

    let outcome = service
        .on_message(&payload("intersection1", 20, 10.0, 25))
        .await
        .unwrap();
    assert!(outcome.is_anomaly);
    assert!(outcome.alert_id.is_some());

    let samples = store.samples().await;
    assert_eq!(samples.len(), 21);
    assert!(samples[..20].iter().all(|s| !s.is_anomaly));

    let last = &samples[20];
    assert!(last.is_anomaly);
    assert_eq!(last.congestion_level, CongestionLevel::Red);
    assert!((last.congestion_score - 0.8).abs() < 1e-9);

    let alerts = store.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::High);
    assert_eq!(alerts[0].intersection_id, "intersection1");
    assert_eq!(alerts[0].timestamp_utc, last.timestamp_utc);
}

#[tokio::test]
async fn test_payload_without_fields_is_stored_with_defaults() {
    let (store, service) = pipeline();

    service.on_message(b"{}").await.unwrap();

    let samples = store.samples().await;
    assert_eq!(samples.len(), 1);

    let sample = &samples[0];
    assert_eq!(sample.intersection_id, "intersection1");
    assert_eq!(sample.avg_speed_kmh, 0.0);
    assert_eq!(sample.vehicle_count, 0);
    assert_eq!(sample.congestion_score, 1.0);
    assert_eq!(sample.congestion_level, CongestionLevel::Red);
    assert!(!sample.is_anomaly);
    assert!(chrono::DateTime::parse_from_rfc3339(&sample.timestamp_utc).is_ok());

    assert!(store.alerts().await.is_empty());
}

#[tokio::test]
async fn test_steady_traffic_is_never_flagged() {
    let (store, service) = pipeline();

    for minute in 0..5 {
        let outcome = service
            .on_message(&payload("intersection2", minute, 45.0, 8))
            .await
            .unwrap();
        assert!(!outcome.is_anomaly);
    }

    let samples = store.samples().await;
    assert_eq!(samples.len(), 5);
    for sample in &samples {
        assert!(!sample.is_anomaly);
        assert_eq!(
            sample.congestion_level,
            CongestionLevel::from_score(sample.congestion_score)
        );
        assert!(matches!(
            sample.congestion_level,
            CongestionLevel::Green | CongestionLevel::Yellow
        ));
    }
    assert!(store.alerts().await.is_empty());
}

#[tokio::test]
async fn test_malformed_payload_writes_nothing() {
    let (store, service) = pipeline();

    assert!(service.on_message(b"not json at all").await.is_err());
    assert!(service.on_message(b"[1, 2, 3]").await.is_err());

    assert!(store.samples().await.is_empty());
    assert!(store.alerts().await.is_empty());
}

#[tokio::test]
async fn test_history_is_kept_per_intersection() {
    let (store, service) = pipeline();

    for minute in 0..10 {
        service
            .on_message(&payload("intersection1", minute, 50.0, 10))
            .await
            .unwrap();
    }

    // No history for intersection2, so a slow first reading is not an anomaly
    let outcome = service
        .on_message(&payload("intersection2", 10, 5.0, 40))
        .await
        .unwrap();
    assert!(!outcome.is_anomaly);
    assert!(store.alerts().await.is_empty());
}

#[tokio::test]
async fn test_recent_samples_reads_are_stable() {
    let (store, service) = pipeline();

    for minute in 0..8 {
        service
            .on_message(&payload("intersection3", minute, 30.0 + minute as f64, 5))
            .await
            .unwrap();
    }

    let input = RecentSamplesRepoInput {
        intersection_id: "intersection3".to_string(),
        limit: 5,
    };
    let first = store.recent_samples(input.clone()).await.unwrap();
    let second = store.recent_samples(input).await.unwrap();

    assert_eq!(first, second);
    let speeds: Vec<f64> = first.iter().map(|s| s.avg_speed_kmh).collect();
    assert_eq!(speeds, vec![33.0, 34.0, 35.0, 36.0, 37.0]);
}

#[tokio::test]
async fn test_concurrent_ingest_assigns_unique_ids() {
    let (store, service) = pipeline();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for i in 0..4 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            for minute in 0..5 {
                let id = format!("intersection{}", i);
                service
                    .on_message(&payload(&id, minute, 40.0, 6))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut ids: Vec<i64> = store.samples().await.iter().map(|s| s.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=20).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_negative_speeds_are_stored_as_zero_and_do_not_skew_history() {
    let (store, service) = pipeline();

    for (minute, speed) in [(0, -30.0), (1, 10.0), (2, 10.0), (3, 10.0)] {
        service
            .on_message(&payload("intersection4", minute, speed, 4))
            .await
            .unwrap();
    }

    let samples = store.samples().await;
    assert_eq!(samples[0].avg_speed_kmh, 0.0);
    assert_eq!(samples[0].congestion_score, 1.0);
    assert!(samples.iter().all(|s| s.avg_speed_kmh >= 0.0));

    // Trailing mean is 7.5, so anything under 4.5 is a slowdown
    let outcome = service
        .on_message(&payload("intersection4", 4, 3.0, 4))
        .await
        .unwrap();
    assert!(outcome.is_anomaly);
    assert_eq!(store.alerts().await.len(), 1);
}
