//! Dispatcher - publish job ids to the durable queue

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel, Connection};
use uuid::Uuid;

use super::message::{JobMessage, CONTENT_TYPE};
use super::{declare_queue, PERSISTENT};
use crate::error::QueueError;

#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, job_id: Uuid) -> Result<(), QueueError>;
}

/// Publishes persistent messages through the default exchange
pub struct AmqpPublisher {
    // Closing the connection closes the channel
    _connection: Connection,
    channel: Channel,
    queue_name: String,
}

impl AmqpPublisher {
    /// Open a channel on `connection` and declare the queue
    pub async fn new(connection: Connection, queue_name: &str) -> Result<Self, QueueError> {
        let channel = connection.create_channel().await?;
        declare_queue(&channel, queue_name).await?;

        Ok(Self {
            _connection: connection,
            channel,
            queue_name: queue_name.to_string(),
        })
    }
}

#[async_trait]
impl JobPublisher for AmqpPublisher {
    async fn publish(&self, job_id: Uuid) -> Result<(), QueueError> {
        let body = JobMessage::new(job_id).encode()?;

        self.channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(PERSISTENT)
                    .with_content_type(CONTENT_TYPE.into()),
            )
            .await?
            .await?;

        tracing::info!(%job_id, queue = %self.queue_name, "Job published");
        Ok(())
    }
}
