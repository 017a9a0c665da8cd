//! Static wallet map for development and tests.

use crate::{AccountError, AccountInterface};
use alloy::primitives::Address;
use async_trait::async_trait;
use bot_types::{ConfigSchema, ValidationError, ValidationErrors, Wallet};
use std::collections::HashMap;

/// Wallets listed in configuration, keyed by Telegram user id.
pub struct LocalAccounts {
	wallets: HashMap<String, Wallet>,
}

impl LocalAccounts {
	pub fn new(wallets: HashMap<String, Wallet>) -> Self {
		Self { wallets }
	}
}

/// Configuration schema for LocalAccounts.
///
/// Expects a `wallets` table mapping user ids to addresses.
pub struct LocalAccountsSchema;

impl ConfigSchema for LocalAccountsSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		let Some(wallets) = config.get("wallets") else {
			return Ok(());
		};
		let table = wallets.as_table().ok_or_else(|| {
			ValidationErrors::single(ValidationError::TypeMismatch {
				field: "wallets".to_string(),
				expected: "table".to_string(),
				actual: wallets.type_str().to_string(),
			})
		})?;

		let errors: Vec<ValidationError> = table
			.iter()
			.filter(|(_, v)| v.as_str().and_then(|s| s.parse::<Address>().ok()).is_none())
			.map(|(user, _)| ValidationError::InvalidValue {
				field: format!("wallets.{}", user),
				message: "must be a 0x address".to_string(),
			})
			.collect();

		if errors.is_empty() {
			Ok(())
		} else {
			Err(ValidationErrors(errors))
		}
	}
}

#[async_trait]
impl AccountInterface for LocalAccounts {
	async fn wallet_for_telegram_user(
		&self,
		telegram_user_id: &str,
	) -> Result<Wallet, AccountError> {
		self.wallets
			.get(telegram_user_id)
			.cloned()
			.ok_or_else(|| AccountError::NotFound(telegram_user_id.to_string()))
	}
}

/// Factory function to create the local provider from configuration.
///
/// Configuration parameters:
/// - `wallets`: table of `"<telegram id>" = "<address>"`
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountsSchema
		.validate(config)
		.map_err(|e| AccountError::Configuration(e.to_string()))?;

	let mut wallets = HashMap::new();
	if let Some(table) = config.get("wallets").and_then(|v| v.as_table()) {
		for (user, value) in table {
			let address = value
				.as_str()
				.and_then(|s| s.parse::<Address>().ok())
				.ok_or_else(|| AccountError::Configuration(format!("wallets.{}", user)))?;
			wallets.insert(
				user.clone(),
				Wallet {
					id: format!("local-{}", user),
					address,
				},
			);
		}
	}

	Ok(Box::new(LocalAccounts::new(wallets)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_lookup_from_config() {
		let config: toml::Value = toml::from_str(
			r#"
[wallets]
"42" = "0x1111111111111111111111111111111111111111"
"#,
		)
		.unwrap();
		let accounts = create_account(&config).unwrap();

		let wallet = accounts.wallet_for_telegram_user("42").await.unwrap();
		assert_eq!(wallet.id, "local-42");
		assert_eq!(
			wallet.address,
			"0x1111111111111111111111111111111111111111"
				.parse::<Address>()
				.unwrap()
		);

		assert!(matches!(
			accounts.wallet_for_telegram_user("43").await,
			Err(AccountError::NotFound(id)) if id == "43"
		));
	}

	#[test]
	fn test_rejects_bad_addresses() {
		let config: toml::Value = toml::from_str(
			r#"
[wallets]
"1" = "0x1111111111111111111111111111111111111111"
"2" = "not-an-address"
"3" = 7
"#,
		)
		.unwrap();

		let errors = LocalAccountsSchema.validate(&config).unwrap_err();
		assert_eq!(errors.fields(), vec!["wallets.2", "wallets.3"]);
		assert!(create_account(&config).is_err());
	}
}
