mod config;

use common::domain::TelemetryStore;
use common::postgres::{ensure_schema, PostgresClient, PostgresTelemetryStore};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders};
use config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use traffic_processor::TrafficProcessor;
use traffic_runner::Runner;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> =
        match init_telemetry(&config.telemetry_config()) {
            Ok(providers) => providers,
            Err(e) => {
                eprintln!("Failed to initialize telemetry: {}", e);
                std::process::exit(1);
            }
        };

    info!(
        otel_enabled = config.otel_enabled,
        otel_endpoint = %config.otel_endpoint,
        "Starting traffic-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    let postgres_client = match initialize_postgres(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize PostgreSQL: {:#}", e);
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn TelemetryStore> =
        Arc::new(PostgresTelemetryStore::new(postgres_client.clone()));

    let traffic_processor = match TrafficProcessor::new(
        store,
        &config.processor_config(),
        config.mqtt_config(),
        config.topics(),
    ) {
        Ok(processor) => processor,
        Err(e) => {
            error!("Failed to initialize traffic processor: {}", e);
            postgres_client.close();
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };

    let mut runner = Runner::new();

    for (name, process) in traffic_processor.into_runner_processes() {
        runner = runner.with_named_process(name, process);
    }

    runner = runner
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            postgres_client.close();

            // Flush pending traces and logs
            shutdown_telemetry(telemetry_providers);

            info!("Cleanup complete");
            Ok(())
        })
        .with_drain_timeout(config.shutdown_drain_timeout())
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

/// Connect, verify reachability and create tables, bounded by the startup timeout
async fn initialize_postgres(config: &ServiceConfig) -> anyhow::Result<PostgresClient> {
    info!("Initializing PostgreSQL...");
    let client = PostgresClient::new(&config.postgres_config())?;

    tokio::time::timeout(config.startup_timeout(), async {
        client.ping().await?;
        ensure_schema(&client).await
    })
    .await
    .map_err(|_| {
        anyhow::anyhow!(
            "PostgreSQL not ready within {}s",
            config.startup_timeout_secs
        )
    })??;

    info!(
        host = %config.postgres_host,
        database = %config.postgres_database,
        "PostgreSQL ready"
    );
    Ok(client)
}
