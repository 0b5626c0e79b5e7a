use common::domain::{DomainError, DomainResult};

/// Telemetry topic in the form `{prefix}/{intersection_id}`
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTopic {
    pub intersection_id: String,
}

/// Validate a per-intersection topic and extract its intersection segment
///
/// # Examples
/// ```
/// use traffic_processor::mqtt::parse_topic;
///
/// let parsed = parse_topic("smart_traffic/intersection1").unwrap();
/// assert_eq!(parsed.intersection_id, "intersection1");
/// ```
pub fn parse_topic(topic: &str) -> DomainResult<ParsedTopic> {
    let Some((prefix, intersection_id)) = topic.rsplit_once('/') else {
        return Err(DomainError::InvalidBrokerConfig(format!(
            "Invalid topic format '{}': expected '{{prefix}}/{{intersection_id}}'",
            topic
        )));
    };

    let intersection_id = intersection_id.trim();

    if prefix.trim().is_empty() {
        return Err(DomainError::InvalidBrokerConfig(
            "Topic prefix cannot be empty".to_string(),
        ));
    }

    if intersection_id.is_empty() || intersection_id == "+" || intersection_id == "#" {
        return Err(DomainError::InvalidBrokerConfig(format!(
            "Topic '{}' must name a single intersection",
            topic
        )));
    }

    Ok(ParsedTopic {
        intersection_id: intersection_id.to_string(),
    })
}
