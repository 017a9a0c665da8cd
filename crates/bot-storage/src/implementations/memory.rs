//! In-process storage backend.
//!
//! Entries live in a concurrent map and expire lazily: an expired entry is
//! dropped the next time it is read. A periodic sweep is available for
//! long-running processes with many abandoned keys.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use bot_types::{ConfigSchema, Field, FieldType, Schema, ValidationErrors};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

/// Memory backed storage with TTL support.
#[derive(Clone, Default)]
pub struct MemoryStorage {
	entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Removes every expired entry and returns how many were dropped.
	pub fn purge_expired(&self) -> usize {
		let now = Instant::now();
		let before = self.entries.len();
		self.entries.retain(|_, entry| !entry.is_expired(now));
		before - self.entries.len()
	}

	/// Spawns a task that purges expired entries every `interval`.
	pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
		let storage = self.clone();
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			loop {
				ticker.tick().await;
				let purged = storage.purge_expired();
				if purged > 0 {
					tracing::debug!(purged, "Purged expired storage entries");
				}
			}
		})
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
		let now = Instant::now();
		if let Some(entry) = self.entries.get(key) {
			if !entry.is_expired(now) {
				return Ok(Some(entry.value.clone()));
			}
		}
		self.entries.remove_if(key, |_, entry| entry.is_expired(now));
		Ok(None)
	}

	async fn save(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let expires_at = ttl.map(|ttl| Instant::now() + ttl);
		self.entries
			.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.entries.remove(key);
		Ok(())
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"sweep_interval_secs",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
		);
		schema.validate_toml(config)
	}
}

/// Factory function to create a memory backend from configuration.
///
/// Configuration parameters:
/// - `sweep_interval_secs`: optional period of the background expiry sweep
///
/// Must be called from within a tokio runtime when a sweep is configured.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage = MemoryStorage::new();
	if let Some(secs) = config.get("sweep_interval_secs").and_then(|v| v.as_integer()) {
		storage.spawn_sweeper(Duration::from_secs(secs as u64));
	}
	Ok(Box::new(storage))
}
