//! Kafka producer over the Confluent REST proxy (v2 API).
//!
//! Payloads are sent with the binary embedded format, so the bytes that reach
//! the topic are exactly the bytes stored in the outbox.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use storefront_core::bus::{Acknowledgement, BusError, MessageBus};

/// Content type for produce requests carrying base64-encoded values.
pub const BINARY_CONTENT_TYPE: &str = "application/vnd.kafka.binary.v2+json";

/// Content type of REST proxy v2 responses.
pub const RESPONSE_CONTENT_TYPE: &str = "application/vnd.kafka.v2+json";

#[derive(Debug, Serialize)]
struct ProduceRequest {
    records: Vec<ProduceRecord>,
}

#[derive(Debug, Serialize)]
struct ProduceRecord {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ProduceResponse {
    offsets: Vec<PartitionOffset>,
}

#[derive(Debug, Deserialize)]
struct PartitionOffset {
    partition: Option<i32>,
    offset: Option<i64>,
    error_code: Option<i64>,
    error: Option<String>,
}

fn encode_request(payload: &str) -> ProduceRequest {
    ProduceRequest {
        records: vec![ProduceRecord {
            value: STANDARD.encode(payload.as_bytes()),
        }],
    }
}

fn acknowledgement(topic: &str, response: ProduceResponse) -> Result<Acknowledgement, BusError> {
    let Some(first) = response.offsets.into_iter().next() else {
        return Err(BusError::Rejected(format!(
            "{topic}: proxy returned no offsets"
        )));
    };
    if let Some(code) = first.error_code {
        let reason = first.error.unwrap_or_default();
        return Err(BusError::Rejected(format!("{topic}: error {code} {reason}")));
    }
    Ok(Acknowledgement {
        topic: topic.to_owned(),
        partition: first.partition,
        offset: first.offset,
    })
}

/// Produces outbox payloads to Kafka through a REST proxy.
#[derive(Debug, Clone)]
pub struct KafkaRestBus {
    client: Client,
    base_url: String,
}

impl KafkaRestBus {
    /// Creates a client for the proxy at `base_url`, bounding every HTTP
    /// request by `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Unavailable` if the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, BusError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| BusError::Unavailable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/topics/{topic}", self.base_url)
    }
}

#[async_trait]
impl MessageBus for KafkaRestBus {
    async fn send(&self, topic: &str, payload: &str) -> Result<Acknowledgement, BusError> {
        let body = serde_json::to_vec(&encode_request(payload))
            .map_err(|e| BusError::Rejected(format!("encode produce request: {e}")))?;

        let response = self
            .client
            .post(self.topic_url(topic))
            .header(CONTENT_TYPE, BINARY_CONTENT_TYPE)
            .header(ACCEPT, RESPONSE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::debug!(%status, topic, detail = %detail, "kafka rest proxy refused produce request");
            return Err(if status.is_server_error() {
                BusError::Unavailable(format!("{status}: {detail}"))
            } else {
                BusError::Rejected(format!("{status}: {detail}"))
            });
        }

        let produced: ProduceResponse = response
            .json()
            .await
            .map_err(|e| BusError::Unavailable(format!("unreadable produce response: {e}")))?;
        acknowledgement(topic, produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wraps_payload_as_base64_value() {
        let request = encode_request(r#"{"name":"Lamp"}"#);

        let json = serde_json::to_value(&request).unwrap();
        let value = json["records"][0]["value"].as_str().unwrap();
        assert_eq!(STANDARD.decode(value).unwrap(), br#"{"name":"Lamp"}"#);
    }

    #[test]
    fn test_first_offset_becomes_acknowledgement() {
        let response: ProduceResponse = serde_json::from_value(serde_json::json!({
            "key_schema_id": null,
            "value_schema_id": null,
            "offsets": [{"partition": 2, "offset": 41, "error_code": null, "error": null}]
        }))
        .unwrap();

        let ack = acknowledgement("products", response).unwrap();

        assert_eq!(ack.topic, "products");
        assert_eq!(ack.partition, Some(2));
        assert_eq!(ack.offset, Some(41));
    }

    #[test]
    fn test_record_error_code_is_rejection() {
        let response: ProduceResponse = serde_json::from_value(serde_json::json!({
            "offsets": [{"partition": null, "offset": null, "error_code": 50002, "error": "Kafka error"}]
        }))
        .unwrap();

        let result = acknowledgement("products", response);

        assert!(matches!(result, Err(BusError::Rejected(_))));
    }

    #[test]
    fn test_trailing_slash_is_trimmed_from_base_url() {
        let bus = KafkaRestBus::new("http://proxy:8082/", Duration::from_secs(1)).unwrap();

        assert_eq!(bus.topic_url("products"), "http://proxy:8082/topics/products");
    }
}
