//! Conversation state per Telegram user.
//!
//! Sessions are stored under the `sessions` namespace with a TTL that is
//! refreshed on every write, so abandoned conversations disappear on their
//! own. Updates of one user are serialized with [`SessionStore::lock`].

use bot_storage::{StorageError, StorageService};
use bot_types::UserSession;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

const NAMESPACE: &str = "sessions";

pub struct SessionStore {
	storage: Arc<StorageService>,
	ttl: Duration,
	locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive access to one user's session until dropped.
pub struct SessionGuard<'a> {
	store: &'a SessionStore,
	user_id: String,
	guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
	fn drop(&mut self) {
		self.guard.take();
		// Forget the lock once nobody else waits on it.
		self.store
			.locks
			.remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
	}
}

impl SessionStore {
	pub fn new(storage: Arc<StorageService>, ttl: Duration) -> Self {
		Self {
			storage,
			ttl,
			locks: DashMap::new(),
		}
	}

	/// Waits for exclusive access to the session of `user_id`.
	pub async fn lock(&self, user_id: &str) -> SessionGuard<'_> {
		let lock = self
			.locks
			.entry(user_id.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();
		let guard = lock.lock_owned().await;

		SessionGuard {
			store: self,
			user_id: user_id.to_string(),
			guard: Some(guard),
		}
	}

	/// Current session of the user, if any.
	///
	/// A stored record that no longer decodes is returned as a
	/// [`StorageError::Serialization`] error.
	pub async fn get(&self, user_id: &str) -> Result<Option<UserSession>, StorageError> {
		self.storage.get(NAMESPACE, user_id).await
	}

	pub async fn set(&self, user_id: &str, session: &UserSession) -> Result<(), StorageError> {
		self.storage
			.put(NAMESPACE, user_id, session, Some(self.ttl))
			.await
	}

	pub async fn delete(&self, user_id: &str) -> Result<(), StorageError> {
		self.storage.remove(NAMESPACE, user_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bot_storage::implementations::memory::MemoryStorage;
	use bot_storage::StorageInterface;
	use bot_types::{Action, Network, Step};

	fn store(ttl: Duration) -> (SessionStore, MemoryStorage) {
		let backend = MemoryStorage::new();
		let storage = Arc::new(StorageService::new(Box::new(backend.clone())));
		(SessionStore::new(storage, ttl), backend)
	}

	#[tokio::test]
	async fn test_get_set_delete() {
		let (sessions, _) = store(Duration::from_secs(60));
		assert_eq!(sessions.get("42").await.unwrap(), None);

		let mut session = UserSession::new(Action::Send);
		session.network = Some(Network::Base);
		session.step = Some(Step::Address);
		sessions.set("42", &session).await.unwrap();
		assert_eq!(sessions.get("42").await.unwrap(), Some(session));

		sessions.delete("42").await.unwrap();
		assert_eq!(sessions.get("42").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_sessions_expire() {
		let (sessions, _) = store(Duration::from_millis(10));
		sessions
			.set("42", &UserSession::new(Action::Buy))
			.await
			.unwrap();

		tokio::time::sleep(Duration::from_millis(30)).await;
		assert_eq!(sessions.get("42").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_corrupt_record_is_an_error() {
		let (sessions, backend) = store(Duration::from_secs(60));
		backend
			.save("sessions:42", br#"{"action":"swap"}"#.to_vec(), None)
			.await
			.unwrap();

		assert!(matches!(
			sessions.get("42").await,
			Err(StorageError::Serialization(_))
		));
	}

	#[tokio::test]
	async fn test_lock_serializes_one_user() {
		let (sessions, _) = store(Duration::from_secs(60));
		let sessions = Arc::new(sessions);

		let guard = sessions.lock("42").await;
		assert!(
			tokio::time::timeout(Duration::from_millis(50), sessions.lock("7"))
				.await
				.is_ok()
		);

		let contender = {
			let sessions = sessions.clone();
			tokio::spawn(async move {
				let _guard = sessions.lock("42").await;
			})
		};
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(!contender.is_finished());

		drop(guard);
		contender.await.unwrap();
		assert!(sessions.locks.is_empty());
	}
}
