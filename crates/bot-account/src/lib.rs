//! Custodial wallet lookup.
//!
//! Maps a Telegram user id to the embedded wallet the auth provider manages
//! for that user.

use async_trait::async_trait;
use bot_types::Wallet;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
	pub mod privy;
}

#[derive(Debug, Error)]
pub enum AccountError {
	/// The provider knows no user, or the user has no wallet.
	#[error("Wallet not found for user {0}")]
	NotFound(String),
	#[error("Provider error: {0}")]
	Provider(String),
	#[error("Invalid provider response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Resolves the custodial wallet of a Telegram user.
	async fn wallet_for_telegram_user(&self, telegram_user_id: &str)
		-> Result<Wallet, AccountError>;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub async fn wallet(&self, telegram_user_id: &str) -> Result<Wallet, AccountError> {
		self.provider.wallet_for_telegram_user(telegram_user_id).await
	}
}
