//! In-process queue with visibility timeouts and a dead-letter list.

use crate::{QueueError, QueueInterface, QueueMessage};
use async_trait::async_trait;
use bot_types::{ConfigSchema, Field, FieldType, Schema, ValidationErrors};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tracing::{error, warn};
use uuid::Uuid;

struct InFlight {
	message: QueueMessage,
	visible_at: Instant,
}

#[derive(Default)]
struct QueueState {
	ready: VecDeque<QueueMessage>,
	in_flight: HashMap<Uuid, InFlight>,
	dead_letters: Vec<QueueMessage>,
}

impl QueueState {
	/// Moves expired in-flight messages back to the front of the queue, or to
	/// the dead-letter list once they used up their deliveries.
	fn reclaim_expired(&mut self, now: Instant, max_deliveries: u32) {
		let expired: Vec<Uuid> = self
			.in_flight
			.iter()
			.filter(|(_, entry)| entry.visible_at <= now)
			.map(|(id, _)| *id)
			.collect();

		for id in expired {
			let Some(entry) = self.in_flight.remove(&id) else {
				continue;
			};
			if entry.message.attempts >= max_deliveries {
				error!(
					message_id = %id,
					attempts = entry.message.attempts,
					body = %entry.message.body,
					"Message exceeded max deliveries, dead-lettering"
				);
				self.dead_letters.push(entry.message);
			} else {
				warn!(message_id = %id, attempts = entry.message.attempts, "Visibility timeout expired, redelivering");
				self.ready.push_front(entry.message);
			}
		}
	}
}

#[derive(Clone)]
pub struct MemoryQueue {
	state: Arc<Mutex<QueueState>>,
	notify: Arc<Notify>,
	visibility_timeout: Duration,
	max_deliveries: u32,
}

impl MemoryQueue {
	pub fn new(visibility_timeout: Duration, max_deliveries: u32) -> Self {
		Self {
			state: Arc::new(Mutex::new(QueueState::default())),
			notify: Arc::new(Notify::new()),
			visibility_timeout,
			max_deliveries,
		}
	}

	/// Messages that were never acknowledged within their delivery limit.
	pub async fn dead_letters(&self) -> Vec<QueueMessage> {
		self.state.lock().await.dead_letters.clone()
	}

	/// Messages waiting or in flight.
	pub async fn depth(&self) -> usize {
		let state = self.state.lock().await;
		state.ready.len() + state.in_flight.len()
	}

	async fn take_batch(&self, max: usize) -> Vec<QueueMessage> {
		let now = Instant::now();
		let mut state = self.state.lock().await;
		state.reclaim_expired(now, self.max_deliveries);

		let mut batch = Vec::new();
		while batch.len() < max {
			let Some(mut message) = state.ready.pop_front() else {
				break;
			};
			message.attempts += 1;
			state.in_flight.insert(
				message.id,
				InFlight {
					message: message.clone(),
					visible_at: now + self.visibility_timeout,
				},
			);
			batch.push(message);
		}
		batch
	}
}

#[async_trait]
impl QueueInterface for MemoryQueue {
	async fn send(&self, body: serde_json::Value) -> Result<Uuid, QueueError> {
		let id = Uuid::new_v4();
		self.state.lock().await.ready.push_back(QueueMessage {
			id,
			body,
			attempts: 0,
		});
		self.notify.notify_one();
		Ok(id)
	}

	async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>, QueueError> {
		if max == 0 {
			return Ok(Vec::new());
		}

		let deadline = Instant::now() + wait;
		loop {
			let batch = self.take_batch(max).await;
			if !batch.is_empty() {
				return Ok(batch);
			}

			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				return Ok(Vec::new());
			}
			// A wake-up or the deadline both lead to one more attempt.
			let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
		}
	}

	async fn ack(&self, id: Uuid) -> Result<(), QueueError> {
		let mut state = self.state.lock().await;
		if state.in_flight.remove(&id).is_some() {
			return Ok(());
		}
		// Redelivery may already have put the message back in line.
		let before = state.ready.len();
		state.ready.retain(|message| message.id != id);
		if state.ready.len() < before {
			Ok(())
		} else {
			Err(QueueError::UnknownMessage(id))
		}
	}
}

/// Configuration schema for MemoryQueue.
pub struct MemoryQueueSchema;

impl ConfigSchema for MemoryQueueSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"visibility_timeout_secs",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new(
					"max_deliveries",
					FieldType::Integer {
						min: Some(1),
						max: Some(u32::MAX as i64),
					},
				),
			],
		);
		schema.validate_toml(config)
	}
}

/// Factory function to create a memory queue from configuration.
///
/// Configuration parameters:
/// - `visibility_timeout_secs`: time before an unacknowledged message is redelivered (default 30)
/// - `max_deliveries`: deliveries before a message is dead-lettered (default 5)
pub fn create_queue(config: &toml::Value) -> Result<Box<dyn QueueInterface>, QueueError> {
	MemoryQueueSchema
		.validate(config)
		.map_err(|e| QueueError::Configuration(e.to_string()))?;

	let visibility_timeout = config
		.get("visibility_timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;
	let max_deliveries = config
		.get("max_deliveries")
		.and_then(|v| v.as_integer())
		.unwrap_or(5) as u32;

	Ok(Box::new(MemoryQueue::new(
		Duration::from_secs(visibility_timeout),
		max_deliveries,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn test_fifo_batches_and_ack() {
		let queue = MemoryQueue::new(Duration::from_secs(30), 5);
		for n in 0..3 {
			queue.send(json!({ "n": n })).await.unwrap();
		}

		let first = queue.receive(2, Duration::ZERO).await.unwrap();
		assert_eq!(first.len(), 2);
		assert_eq!(first[0].body, json!({ "n": 0 }));
		assert_eq!(first[1].body, json!({ "n": 1 }));
		assert!(first.iter().all(|m| m.attempts == 1));

		let second = queue.receive(10, Duration::ZERO).await.unwrap();
		assert_eq!(second.len(), 1);
		assert_eq!(second[0].body, json!({ "n": 2 }));

		for message in first.iter().chain(second.iter()) {
			queue.ack(message.id).await.unwrap();
		}
		assert_eq!(queue.depth().await, 0);
		assert!(matches!(
			queue.ack(first[0].id).await,
			Err(QueueError::UnknownMessage(_))
		));
	}

	#[tokio::test]
	async fn test_receive_waits_for_send() {
		let queue = MemoryQueue::new(Duration::from_secs(30), 5);
		let producer = queue.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			producer.send(json!({ "type": "send" })).await.unwrap();
		});

		let batch = queue.receive(1, Duration::from_secs(2)).await.unwrap();
		assert_eq!(batch.len(), 1);

		let empty = queue.receive(1, Duration::from_millis(20)).await.unwrap();
		assert!(empty.is_empty());
	}

	#[tokio::test]
	async fn test_unacked_message_is_redelivered_then_dead_lettered() {
		let queue = MemoryQueue::new(Duration::from_millis(10), 2);
		queue.send(json!({ "type": "transfer" })).await.unwrap();

		let first = queue.receive(1, Duration::ZERO).await.unwrap();
		assert_eq!(first[0].attempts, 1);
		assert!(queue.receive(1, Duration::ZERO).await.unwrap().is_empty());

		tokio::time::sleep(Duration::from_millis(20)).await;
		let second = queue.receive(1, Duration::ZERO).await.unwrap();
		assert_eq!(second[0].id, first[0].id);
		assert_eq!(second[0].attempts, 2);

		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(queue.receive(1, Duration::ZERO).await.unwrap().is_empty());

		let dead = queue.dead_letters().await;
		assert_eq!(dead.len(), 1);
		assert_eq!(dead[0].id, first[0].id);
		assert_eq!(queue.depth().await, 0);
	}

	#[test]
	fn test_factory_validates() {
		let config: toml::Value = toml::from_str("max_deliveries = 0").unwrap();
		assert!(matches!(
			create_queue(&config),
			Err(QueueError::Configuration(_))
		));

		let config: toml::Value =
			toml::from_str("visibility_timeout_secs = 5\nmax_deliveries = 3\nbatch_size = 10")
				.unwrap();
		assert!(create_queue(&config).is_ok());
	}
}
