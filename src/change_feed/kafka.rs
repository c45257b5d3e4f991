use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use uuid::Uuid;

use super::{FeedError, FeedReader, FeedSource};

/// Opens one Kafka consumer per watch session.
///
/// Every reader joins a throwaway consumer group `{group}-watch-{suffix}`
/// starting at the latest offset, so each session receives the full stream
/// from the moment it opened without affecting any other session.
#[derive(Debug, Clone)]
pub struct KafkaFeedSource {
    brokers: String,
    topic: String,
    group_prefix: String,
}

impl KafkaFeedSource {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>, group_prefix: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
            group_prefix: group_prefix.into(),
        }
    }

    fn session_group_id(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-watch-{}", self.group_prefix, &suffix[..8])
    }
}

#[async_trait]
impl FeedSource for KafkaFeedSource {
    async fn open_reader(&self) -> Result<Box<dyn FeedReader>, FeedError> {
        let group_id = self.session_group_id();

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &group_id)
            .set("auto.offset.reset", "latest")
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| FeedError::Open(e.to_string()))?;

        consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| FeedError::Open(e.to_string()))?;

        tracing::debug!(group_id = %group_id, topic = %self.topic, "Opened change feed consumer");
        Ok(Box::new(KafkaFeedReader { consumer }))
    }
}

struct KafkaFeedReader {
    consumer: StreamConsumer,
}

#[async_trait]
impl FeedReader for KafkaFeedReader {
    async fn next_record(&mut self) -> Result<Vec<u8>, FeedError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| FeedError::Read(e.to_string()))?;

        Ok(message.payload().map(<[u8]>::to_vec).unwrap_or_default())
    }
}
