//! Order queue between the conversation flow and the order processor.
//!
//! Delivery is at-least-once: a received message stays invisible to other
//! receivers until it is acknowledged or its visibility timeout expires, at
//! which point it becomes available again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

#[derive(Debug, Error)]
pub enum QueueError {
	/// The message id is neither in flight nor waiting.
	#[error("Unknown message {0}")]
	UnknownMessage(Uuid),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
	pub id: Uuid,
	pub body: serde_json::Value,
	/// Number of times this message has been received, this delivery included
	pub attempts: u32,
}

#[async_trait]
pub trait QueueInterface: Send + Sync {
	/// Enqueues a message body and returns its id.
	async fn send(&self, body: serde_json::Value) -> Result<Uuid, QueueError>;

	/// Receives up to `max` messages, waiting at most `wait` for the first one.
	///
	/// Returns an empty batch when nothing arrived in time.
	async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>, QueueError>;

	/// Deletes a received message so it is not delivered again.
	async fn ack(&self, id: Uuid) -> Result<(), QueueError>;
}

pub struct QueueService {
	backend: Box<dyn QueueInterface>,
}

impl QueueService {
	pub fn new(backend: Box<dyn QueueInterface>) -> Self {
		Self { backend }
	}

	pub async fn send(&self, body: serde_json::Value) -> Result<Uuid, QueueError> {
		let id = self.backend.send(body).await?;
		tracing::debug!(message_id = %id, "Enqueued message");
		Ok(id)
	}

	pub async fn receive(
		&self,
		max: usize,
		wait: Duration,
	) -> Result<Vec<QueueMessage>, QueueError> {
		self.backend.receive(max, wait).await
	}

	pub async fn ack(&self, id: Uuid) -> Result<(), QueueError> {
		self.backend.ack(id).await
	}
}
