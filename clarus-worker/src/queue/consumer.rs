//! Consumer - one delivery at a time, acked once its outcome is recorded
//!
//! The job row is the durable record of the outcome, so a delivery is acked
//! whether the job ended `done` or `failed`. Unparseable bodies are acked
//! and dropped so they cannot block the queue. When the store itself failed
//! the outcome was not recorded, so the delivery is requeued.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions};
use lapin::types::FieldTable;
use lapin::Channel;

use super::declare_queue;
use super::message::JobMessage;
use crate::error::QueueError;
use crate::jobs::{JobOutcome, JobProcessor};

/// Pause before requeueing a delivery whose store writes failed
const REQUEUE_DELAY: Duration = Duration::from_secs(1);

/// What the consumer did with one delivery
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Body was not a job message
    Poison,
    Processed(JobOutcome),
    /// The job store failed; the job row may still say `queued`/`running`
    StoreFailed(String),
}

/// Broker-side settlement of one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    Requeue,
}

impl DeliveryOutcome {
    pub fn settlement(&self) -> Settlement {
        match self {
            DeliveryOutcome::Poison | DeliveryOutcome::Processed(_) => Settlement::Ack,
            DeliveryOutcome::StoreFailed(_) => Settlement::Requeue,
        }
    }
}

pub struct JobConsumer {
    channel: Channel,
    queue_name: String,
    consumer_tag: String,
    processor: Arc<JobProcessor>,
}

impl JobConsumer {
    pub fn new(channel: Channel, queue_name: &str, processor: Arc<JobProcessor>) -> Self {
        Self {
            channel,
            queue_name: queue_name.to_string(),
            consumer_tag: format!("clarus-worker-{}", std::process::id()),
            processor,
        }
    }

    /// Consume until the broker closes the stream.
    ///
    /// Never returns `Ok`: a closed stream or a broker error ends the worker.
    pub async fn run(self) -> Result<(), QueueError> {
        declare_queue(&self.channel, &self.queue_name).await?;
        self.channel
            .basic_qos(1, BasicQosOptions::default())
            .await?;

        let mut consumer = self
            .channel
            .basic_consume(
                &self.queue_name,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = %self.queue_name, tag = %self.consumer_tag, "Consuming");

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;

            let outcome = handle_delivery(&self.processor, &delivery.data).await;
            tracing::debug!(delivery_tag = delivery.delivery_tag, ?outcome, "Delivery handled");

            match outcome.settlement() {
                Settlement::Ack => delivery.ack(BasicAckOptions::default()).await?,
                Settlement::Requeue => {
                    tracing::warn!(delivery_tag = delivery.delivery_tag, "Requeueing delivery");
                    tokio::time::sleep(REQUEUE_DELAY).await;
                    delivery
                        .nack(BasicNackOptions {
                            requeue: true,
                            ..BasicNackOptions::default()
                        })
                        .await?
                }
            }
        }

        Err(QueueError::ConsumerClosed)
    }
}

/// Decode one body and run its job; never fails
pub async fn handle_delivery(processor: &JobProcessor, body: &[u8]) -> DeliveryOutcome {
    let message = match JobMessage::decode(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Dropping unparseable message");
            return DeliveryOutcome::Poison;
        }
    };

    match processor.process(message.job_id).await {
        Ok(outcome) => DeliveryOutcome::Processed(outcome),
        Err(e) => {
            tracing::error!(job_id = %message.job_id, error = %e, "Job store failure");
            DeliveryOutcome::StoreFailed(e.to_string())
        }
    }
}
