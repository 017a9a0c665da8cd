//! Outbound side of the Telegram Bot API.

use async_trait::async_trait;
use bot_types::OutboundMessage;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod bot_api;
}

#[derive(Debug, Error)]
pub enum MessengerError {
	#[error("HTTP error: {0}")]
	Http(String),
	/// Telegram answered with `ok: false`.
	#[error("Telegram API error {code}: {description}")]
	Api { code: i64, description: String },
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait MessengerInterface: Send + Sync {
	async fn send_message(&self, message: &OutboundMessage) -> Result<(), MessengerError>;

	/// Stops the loading indicator on the pressed button.
	async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), MessengerError>;

	/// Registers the webhook URL Telegram delivers updates to.
	async fn set_webhook(&self, url: &str, secret_token: Option<&str>)
		-> Result<(), MessengerError>;
}

pub struct MessengerService {
	messenger: Box<dyn MessengerInterface>,
}

impl MessengerService {
	pub fn new(messenger: Box<dyn MessengerInterface>) -> Self {
		Self { messenger }
	}

	pub async fn send(&self, message: &OutboundMessage) -> Result<(), MessengerError> {
		self.messenger.send_message(message).await
	}

	pub async fn answer_callback(&self, callback_query_id: &str) -> Result<(), MessengerError> {
		self.messenger.answer_callback_query(callback_query_id).await
	}

	pub async fn set_webhook(
		&self,
		url: &str,
		secret_token: Option<&str>,
	) -> Result<(), MessengerError> {
		self.messenger.set_webhook(url, secret_token).await
	}
}
