//! Message types exchanged with queue collaborators

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A message to publish: body plus string attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub body: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl OutboundMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A message handed to a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub message_id: String,
    /// Handle used to acknowledge or release the delivery
    #[serde(default)]
    pub receipt: Option<String>,
    pub body: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// How many times this message has been handed out, including this time
    #[serde(default = "default_receive_count")]
    pub receive_count: u32,
}

fn default_receive_count() -> u32 {
    1
}

impl Delivery {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            receipt: None,
            body: body.into(),
            attributes: BTreeMap::new(),
            receive_count: 1,
        }
    }

    pub fn from_message(message_id: impl Into<String>, message: OutboundMessage) -> Self {
        Self {
            attributes: message.attributes,
            ..Self::new(message_id, message.body)
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Lambda SQS event: `{"Records": [...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    pub message_id: String,
    #[serde(default)]
    pub receipt_handle: Option<String>,
    pub body: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_attributes: HashMap<String, SqsMessageAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessageAttribute {
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
}

/// SNS notification envelope, present when an SNS subscription delivers
/// to SQS without raw message delivery
#[derive(Debug, Deserialize)]
struct SnsEnvelope {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "MessageAttributes", default)]
    message_attributes: HashMap<String, SnsMessageAttribute>,
}

#[derive(Debug, Deserialize)]
struct SnsMessageAttribute {
    #[serde(rename = "Value")]
    value: String,
}

impl From<SqsRecord> for Delivery {
    fn from(record: SqsRecord) -> Self {
        let receive_count = record
            .attributes
            .get("ApproximateReceiveCount")
            .and_then(|count| count.parse().ok())
            .unwrap_or(1);

        let mut attributes: BTreeMap<String, String> = record
            .message_attributes
            .into_iter()
            .filter_map(|(name, attribute)| attribute.string_value.map(|value| (name, value)))
            .collect();

        let body = match serde_json::from_str::<SnsEnvelope>(&record.body) {
            Ok(envelope) if envelope.kind == "Notification" => {
                for (name, attribute) in envelope.message_attributes {
                    attributes.entry(name).or_insert(attribute.value);
                }
                envelope.message
            }
            _ => record.body,
        };

        Self {
            message_id: record.message_id,
            receipt: record.receipt_handle,
            body,
            attributes,
            receive_count,
        }
    }
}

impl SqsEvent {
    pub fn into_deliveries(self) -> Vec<Delivery> {
        self.records.into_iter().map(Delivery::from).collect()
    }
}
