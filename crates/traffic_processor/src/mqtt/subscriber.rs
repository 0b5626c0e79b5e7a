use crate::domain::TelemetryIngestionService;
use crate::mqtt::{parse_topic, MqttSubscriberConfig, ReconnectBackoff};
use common::domain::{DomainError, DomainResult};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument, Span};

/// Run the MQTT subscriber for one telemetry topic
///
/// Connection failures never end the subscriber: it reconnects with
/// exponential backoff until `shutdown_token` is cancelled.
#[instrument(name = "mqtt_subscriber", skip_all, fields(topic = %topic))]
pub async fn run_mqtt_subscriber(
    topic: String,
    config: MqttSubscriberConfig,
    ingestion_service: &TelemetryIngestionService,
    shutdown_token: CancellationToken,
) {
    info!(
        topic = %topic,
        host = %config.host,
        port = config.port,
        "starting MQTT subscriber"
    );

    let mut backoff =
        ReconnectBackoff::new(config.reconnect_initial_delay(), config.reconnect_max_delay());

    loop {
        if shutdown_token.is_cancelled() {
            debug!(topic = %topic, "MQTT subscriber cancelled before connection");
            break;
        }

        match run_mqtt_connection(
            &topic,
            &config,
            &mut backoff,
            ingestion_service,
            &shutdown_token,
        )
        .await
        {
            Ok(()) => {
                debug!(topic = %topic, "MQTT subscriber stopped cleanly");
                break;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(
                    topic = %topic,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "MQTT connection lost, reconnecting"
                );

                tokio::select! {
                    _ = shutdown_token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    info!(topic = %topic, "MQTT subscriber stopped");
}

/// Run a single MQTT session until shutdown or a connection error
#[instrument(name = "mqtt_connection", skip_all, fields(topic = %topic))]
async fn run_mqtt_connection(
    topic: &str,
    config: &MqttSubscriberConfig,
    backoff: &mut ReconnectBackoff,
    ingestion_service: &TelemetryIngestionService,
    shutdown_token: &CancellationToken,
) -> DomainResult<()> {
    let client_id = config.client_id_for(topic);
    let mut mqtt_options = MqttOptions::new(&client_id, config.host.as_str(), config.port);
    mqtt_options.set_keep_alive(config.keep_alive());
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, config.request_channel_capacity);

    // Queued until the broker acknowledges the connection
    client
        .subscribe(topic, QoS::AtLeastOnce)
        .await
        .map_err(|e| DomainError::TransportError(format!("Failed to subscribe: {}", e)))?;

    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                debug!(topic = %topic, "shutdown signal received");
                let _ = client.disconnect().await;
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        // Processed to completion even if shutdown arrives meanwhile
                        handle_mqtt_message(&publish.topic, &publish.payload, ingestion_service).await;
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        backoff.reset();
                        info!(topic = %topic, client_id = %client_id, "connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        info!(topic = %topic, "subscribed to MQTT topic");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        return Err(DomainError::TransportError(format!(
                            "MQTT event loop error: {}",
                            e
                        )));
                    }
                }
            }
        }
    }
}

/// Handle one telemetry message in its own trace
///
/// Failures are logged and the message is dropped; the subscriber keeps
/// consuming.
pub(crate) async fn handle_mqtt_message(
    topic: &str,
    payload: &[u8],
    ingestion_service: &TelemetryIngestionService,
) {
    let span = info_span!(
        parent: Span::none(),
        "mqtt_message",
        topic = %topic,
        payload_size = payload.len(),
        topic_intersection = tracing::field::Empty,
    );

    async {
        if let Ok(parsed) = parse_topic(topic) {
            Span::current().record("topic_intersection", parsed.intersection_id.as_str());
        }

        match ingestion_service.on_message(payload).await {
            Ok(outcome) => {
                debug!(
                    sample_id = outcome.sample_id,
                    intersection_id = %outcome.intersection_id,
                    "telemetry message processed"
                );
            }
            Err(e @ DomainError::PayloadDecodeError(_)) => {
                warn!(error = %e, "dropping malformed telemetry payload");
            }
            Err(e) => {
                error!(error = %e, "failed to process telemetry message");
            }
        }
    }
    .instrument(span)
    .await
}
