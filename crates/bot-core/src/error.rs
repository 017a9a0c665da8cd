use bot_account::AccountError;
use bot_delivery::DeliveryError;
use bot_order::OrderError;
use bot_queue::QueueError;
use bot_storage::StorageError;
use bot_telegram::MessengerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	#[error("Order error: {0}")]
	Order(#[from] OrderError),
	#[error("Queue error: {0}")]
	Queue(#[from] QueueError),
	#[error("Messenger error: {0}")]
	Messenger(#[from] MessengerError),
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	#[error("Invalid queue message: {0}")]
	InvalidMessage(String),
}

/// Outcome of a conversation step that did not produce a regular reply.
///
/// The router turns every variant into exactly one chat message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
	/// Bad input. The text is a re-prompt and the session is kept.
	#[error("{0}")]
	User(String),
	/// Something the flow needs does not exist. The text is shown and the
	/// session is cleared.
	#[error("{0}")]
	Lookup(String),
	/// A collaborator failed. The detail is logged only, the user gets a
	/// generic message and the session is cleared.
	#[error("{0}")]
	Upstream(String),
}

impl From<StorageError> for StepError {
	fn from(e: StorageError) -> Self {
		StepError::Upstream(format!("session storage: {}", e))
	}
}
