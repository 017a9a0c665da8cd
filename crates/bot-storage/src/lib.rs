//! Key-value storage for conversation state.
//!
//! Backends keep opaque byte records with an optional lifetime and treat
//! an expired record exactly like a missing one. [`StorageService`] adds
//! namespaces and JSON encoding on top.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

#[derive(Debug, Error)]
pub enum StorageError {
	/// A stored record could not be encoded or decoded.
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Byte-level record store.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Live record under `key`, `None` when missing or expired.
	async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

	/// Replaces the record under `key`. A `ttl` starts counting now; `None`
	/// keeps the record until removed.
	async fn save(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
		-> Result<(), StorageError>;

	/// Drops the record under `key`. Removing a missing key succeeds.
	async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed records grouped by namespace.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	pub async fn get<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.backend.load(&Self::key(namespace, id)).await? {
			Some(bytes) => serde_json::from_slice(&bytes)
				.map(Some)
				.map_err(|e| StorageError::Serialization(e.to_string())),
			None => Ok(None),
		}
	}

	pub async fn put<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		record: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.save(&Self::key(namespace, id), bytes, ttl).await
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.remove(&Self::key(namespace, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::implementations::memory::MemoryStorage;
	use super::*;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Draft {
		step: String,
		amount: Option<String>,
	}

	#[tokio::test]
	async fn test_namespaces_are_separate() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let draft = Draft {
			step: "amount".to_string(),
			amount: Some("12.34".to_string()),
		};

		service.put("sessions", "42", &draft, None).await.unwrap();

		assert_eq!(service.get::<Draft>("sessions", "42").await.unwrap(), Some(draft));
		assert_eq!(service.get::<Draft>("orders", "42").await.unwrap(), None);

		service.remove("sessions", "42").await.unwrap();
		assert_eq!(service.get::<Draft>("sessions", "42").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_undecodable_record() {
		let backend = MemoryStorage::new();
		backend
			.save("sessions:7", b"not json".to_vec(), None)
			.await
			.unwrap();
		let service = StorageService::new(Box::new(backend));

		assert!(matches!(
			service.get::<Draft>("sessions", "7").await,
			Err(StorageError::Serialization(_))
		));
	}
}
