use crate::domain::{TelemetryIngestionService, TrafficProcessorConfig};
use crate::mqtt::{parse_topic, run_mqtt_subscriber, MqttSubscriberConfig};
use common::domain::{DomainError, DomainResult, TelemetryStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct TrafficProcessor {
    ingestion_service: Arc<TelemetryIngestionService>,
    mqtt_config: MqttSubscriberConfig,
    topics: Vec<String>,
}

impl TrafficProcessor {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        processor_config: &TrafficProcessorConfig,
        mqtt_config: MqttSubscriberConfig,
        topics: Vec<String>,
    ) -> DomainResult<Self> {
        info!("Initializing traffic processor module");

        processor_config.validate()?;

        let topics: Vec<String> = topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if topics.is_empty() {
            return Err(DomainError::InvalidBrokerConfig(
                "At least one telemetry topic is required".to_string(),
            ));
        }

        for topic in &topics {
            if parse_topic(topic).is_err() {
                warn!(topic = %topic, "topic does not follow '{{prefix}}/{{intersection_id}}'");
            }
        }

        let ingestion_service = Arc::new(TelemetryIngestionService::new(store, processor_config));

        info!(topics = ?topics, "Traffic processor initialized");

        Ok(Self {
            ingestion_service,
            mqtt_config,
            topics,
        })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// One named subscriber process per topic
    #[allow(clippy::type_complexity)]
    pub fn into_runner_processes(
        self,
    ) -> Vec<(
        String,
        Box<
            dyn FnOnce(
                    CancellationToken,
                ) -> std::pin::Pin<
                    Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
                > + Send,
        >,
    )> {
        self.topics
            .into_iter()
            .map(|topic| {
                let service = Arc::clone(&self.ingestion_service);
                let config = self.mqtt_config.clone();
                let name = format!("mqtt-subscriber:{}", topic);

                let process: Box<
                    dyn FnOnce(
                            CancellationToken,
                        ) -> std::pin::Pin<
                            Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
                        > + Send,
                > = Box::new(move |ctx| {
                    Box::pin(async move {
                        run_mqtt_subscriber(topic, config, &service, ctx).await;
                        Ok(())
                    })
                });

                (name, process)
            })
            .collect()
    }
}
