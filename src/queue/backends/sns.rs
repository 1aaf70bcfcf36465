//! SNS publisher

use async_trait::async_trait;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chunk::CHUNK_NUMBER_ATTRIBUTE;
use crate::queue::{
    config::QueueConfig,
    error::{QueueError, QueueResult},
    traits::ChunkPublisher,
    types::OutboundMessage,
};

/// Publishes chunk descriptors to an SNS topic
pub struct SnsPublisher {
    client: Arc<Client>,
    topic_arn: String,
}

impl SnsPublisher {
    /// Create a publisher for the configured topic
    pub async fn new(config: &QueueConfig) -> QueueResult<Self> {
        let topic_arn = config
            .topic
            .clone()
            .ok_or_else(|| QueueError::configuration("SNS queue requires a topic ARN"))?;
        info!(topic = %topic_arn, "Initializing SNS publisher");

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(ref region) = config.region {
            loader = loader.region(aws_sdk_sns::config::Region::new(region.clone()));
        }
        if let Some(ref endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Ok(Self {
            client: Arc::new(Client::new(&aws_config)),
            topic_arn,
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl ChunkPublisher for SnsPublisher {
    fn backend_name(&self) -> &'static str {
        "sns"
    }

    async fn publish(&self, message: OutboundMessage) -> QueueResult<String> {
        let mut request = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(message.body);

        for (name, value) in message.attributes {
            // The ordinal is numeric so subscription filter policies can match ranges
            let data_type = if name == CHUNK_NUMBER_ATTRIBUTE {
                "Number"
            } else {
                "String"
            };
            let attribute = MessageAttributeValue::builder()
                .data_type(data_type)
                .string_value(value)
                .build()
                .map_err(|e| QueueError::publish(format!("Invalid message attribute {}: {}", name, e)))?;
            request = request.message_attributes(name, attribute);
        }

        let output = request
            .send()
            .await
            .map_err(|e| QueueError::publish(format!("Failed to publish to SNS: {}", e.into_service_error())))?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        debug!(message_id = %message_id, "Published to SNS");
        Ok(message_id)
    }
}
