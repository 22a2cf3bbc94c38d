//! Queue - durable job hand-off over AMQP
//!
//! - `message` - JSON body codec
//! - `publisher` - producer side (`JobPublisher`)
//! - `consumer` - worker side, prefetch 1, ack after processing, requeue on store failure
//! - `retry` - bounded connection retries

pub mod message;
pub mod publisher;
pub mod consumer;
pub mod retry;

use std::time::Duration;

use lapin::options::QueueDeclareOptions;
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Queue};

use crate::error::QueueError;

pub use consumer::{handle_delivery, DeliveryOutcome, JobConsumer, Settlement};
pub use message::JobMessage;
pub use publisher::{AmqpPublisher, JobPublisher};
pub use retry::retry_fixed;

/// AMQP delivery mode 2: survive a broker restart
pub const PERSISTENT: u8 = 2;

/// Connect, retrying with a fixed delay; fatal once `attempts` are used up
pub async fn connect_with_retry(
    url: &str,
    attempts: u32,
    delay: Duration,
) -> Result<Connection, QueueError> {
    retry_fixed("RabbitMQ connection", attempts, delay, || {
        Connection::connect(url, ConnectionProperties::default())
    })
    .await
    .map_err(|source| QueueError::ConnectExhausted {
        attempts: attempts.max(1),
        source,
    })
}

/// Idempotent durable queue declaration
pub async fn declare_queue(channel: &Channel, name: &str) -> Result<Queue, QueueError> {
    let queue = channel
        .queue_declare(
            name,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    Ok(queue)
}
