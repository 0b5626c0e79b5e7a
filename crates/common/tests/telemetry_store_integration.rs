#![cfg(feature = "integration-tests")]

use common::domain::{
    AlertSeverity, CongestionLevel, CongestionScorer, InsertAlertRepoInput, InsertSampleRepoInput,
    RecentAverageSpeedRepoInput, RecentSamplesRepoInput, TelemetryStore,
};
use common::postgres::{ensure_schema, PostgresClient, PostgresConfig, PostgresTelemetryStore};
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresClient, PostgresTelemetryStore) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let client = PostgresClient::new(&PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 5,
    })
    .expect("Failed to create client");

    ensure_schema(&client).await.expect("schema creation failed");
    let store = PostgresTelemetryStore::new(client.clone());

    (postgres, client, store)
}

fn sample(intersection_id: &str, speed: f64, is_anomaly: bool) -> InsertSampleRepoInput {
    InsertSampleRepoInput {
        timestamp_utc: "2025-06-01T12:00:00+00:00".to_string(),
        intersection_id: intersection_id.to_string(),
        avg_speed_kmh: speed,
        vehicle_count: 11,
        congestion: CongestionScorer::default().score(speed),
        is_anomaly,
    }
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let (_container, client, _store) = setup_test_db().await;
    ensure_schema(&client).await.unwrap();
    ensure_schema(&client).await.unwrap();
}

#[tokio::test]
async fn test_insert_sample_assigns_increasing_ids_from_one() {
    let (_container, _client, store) = setup_test_db().await;

    let first = store.insert_sample(sample("intersection1", 48.0, false)).await.unwrap();
    let second = store.insert_sample(sample("intersection1", 47.0, false)).await.unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

#[tokio::test]
async fn test_insert_alert_round_trip() {
    let (_container, _client, store) = setup_test_db().await;

    let id = store
        .insert_alert(InsertAlertRepoInput {
            timestamp_utc: "2025-06-01T12:00:00+00:00".to_string(),
            intersection_id: "intersection1".to_string(),
            message: "Sudden slowdown".to_string(),
            severity: AlertSeverity::High,
        })
        .await
        .unwrap();

    assert_eq!(id, 1);
}

#[tokio::test]
async fn test_recent_average_speed_window() {
    let (_container, _client, store) = setup_test_db().await;

    let empty = store
        .recent_average_speed(RecentAverageSpeedRepoInput {
            intersection_id: "intersection1".to_string(),
            limit: 20,
        })
        .await
        .unwrap();
    assert_eq!(empty, None);

    for speed in [10.0, 20.0, 30.0, 40.0] {
        store.insert_sample(sample("intersection1", speed, false)).await.unwrap();
    }
    store.insert_sample(sample("intersection2", 500.0, false)).await.unwrap();

    let avg = store
        .recent_average_speed(RecentAverageSpeedRepoInput {
            intersection_id: "intersection1".to_string(),
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(avg, Some(30.0));
}

#[tokio::test]
async fn test_recent_samples_chronological() {
    let (_container, _client, store) = setup_test_db().await;

    for speed in [50.0, 40.0, 5.0] {
        store
            .insert_sample(sample("intersection1", speed, speed < 10.0))
            .await
            .unwrap();
    }

    let input = RecentSamplesRepoInput {
        intersection_id: "intersection1".to_string(),
        limit: 2,
    };
    let samples = store.recent_samples(input.clone()).await.unwrap();
    let again = store.recent_samples(input).await.unwrap();

    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].id, 2);
    assert_eq!(samples[1].id, 3);
    assert!(samples[1].is_anomaly);
    assert_eq!(samples[1].congestion_level, CongestionLevel::Red);
    assert_eq!(samples, again);
}

#[tokio::test]
async fn test_concurrent_inserts_get_unique_ids() {
    let (_container, _client, store) = setup_test_db().await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .insert_sample(sample("intersection1", 30.0 + i as f64, false))
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
}
