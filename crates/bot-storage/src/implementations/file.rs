//! File-based storage backend.
//!
//! One JSON file per key under a base directory. The expiry time is stored
//! next to the payload, so lifetimes survive restarts.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use bot_types::{ConfigSchema, Field, FieldType, Schema, ValidationErrors};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/sessions";

#[derive(Serialize, Deserialize)]
struct StoredRecord {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_at_ms: Option<u128>,
	/// Hex encoded payload
	data: String,
}

impl StoredRecord {
	fn is_expired(&self) -> bool {
		self.expires_at_ms.is_some_and(|at| at <= unix_millis())
	}
}

fn unix_millis() -> u128 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis())
		.unwrap_or_default()
}

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

pub struct FileStorage {
	root: PathBuf,
}

impl FileStorage {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// `sessions:42` is stored as `sessions_42.json`.
	fn path_for(&self, key: &str) -> PathBuf {
		let file_name: String = key
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
			.collect();
		self.root.join(format!("{}.json", file_name))
	}

	async fn write_atomically(&self, path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
		fs::create_dir_all(&self.root).await.map_err(backend_error)?;
		let staging = path.with_extension("tmp");
		fs::write(&staging, bytes).await.map_err(backend_error)?;
		fs::rename(&staging, path).await.map_err(backend_error)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
		let raw = match fs::read(self.path_for(key)).await {
			Ok(raw) => raw,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(backend_error(e)),
		};

		let record: StoredRecord = serde_json::from_slice(&raw)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		if record.is_expired() {
			self.remove(key).await?;
			return Ok(None);
		}

		hex::decode(&record.data)
			.map(Some)
			.map_err(|e| StorageError::Serialization(e.to_string()))
	}

	async fn save(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let record = StoredRecord {
			expires_at_ms: ttl.map(|ttl| unix_millis() + ttl.as_millis()),
			data: hex::encode(value),
		};
		let bytes =
			serde_json::to_vec(&record).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.write_atomically(&self.path_for(key), bytes).await
	}

	async fn remove(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.path_for(key)).await {
			Err(e) if e.kind() != ErrorKind::NotFound => Err(backend_error(e)),
			_ => Ok(()),
		}
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if !path.trim().is_empty() => Ok(()),
					_ => Err("storage_path must not be empty".to_string()),
				}
			})],
		)
		.validate_toml(config)
	}
}

/// Factory function to create a file backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the records (default `./data/sessions`)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let root = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);
	Ok(Box::new(FileStorage::new(root)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_records_are_files() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path());
		let session = br#"{"action":"send","step":"amount"}"#.to_vec();

		storage.save("sessions:42", session.clone(), None).await.unwrap();
		assert!(dir.path().join("sessions_42.json").exists());
		assert_eq!(storage.load("sessions:42").await.unwrap(), Some(session));

		storage.remove("sessions:42").await.unwrap();
		storage.remove("sessions:42").await.unwrap();
		assert_eq!(storage.load("sessions:42").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_lifetime_survives_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path());
		storage
			.save("a", vec![1], Some(Duration::from_millis(30)))
			.await
			.unwrap();
		storage
			.save("b", vec![2], Some(Duration::from_secs(60)))
			.await
			.unwrap();

		let reopened = FileStorage::new(dir.path());
		assert_eq!(reopened.load("a").await.unwrap(), Some(vec![1]));

		tokio::time::sleep(Duration::from_millis(60)).await;
		assert_eq!(reopened.load("a").await.unwrap(), None);
		assert!(!dir.path().join("a.json").exists());
		assert_eq!(reopened.load("b").await.unwrap(), Some(vec![2]));
	}

	#[tokio::test]
	async fn test_factory() {
		let dir = tempfile::tempdir().unwrap();
		let mut table = toml::Table::new();
		table.insert(
			"storage_path".to_string(),
			toml::Value::String(dir.path().to_string_lossy().to_string()),
		);
		let backend = create_storage(&toml::Value::Table(table)).unwrap();
		backend.save("x", vec![7], None).await.unwrap();
		assert_eq!(backend.load("x").await.unwrap(), Some(vec![7]));

		let bad: toml::Value = toml::from_str("storage_path = 5").unwrap();
		assert!(matches!(
			create_storage(&bad),
			Err(StorageError::Configuration(_))
		));
	}
}
