//! Privy server API account provider.
//!
//! Looks users up by Telegram id and picks their embedded Ethereum wallet
//! from the linked accounts.

use crate::{AccountError, AccountInterface};
use alloy::primitives::Address;
use async_trait::async_trait;
use bot_types::{ConfigSchema, Field, FieldType, Schema, ValidationErrors, Wallet};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://auth.privy.io/api/v1";

#[derive(Debug, Deserialize)]
struct PrivyUser {
	#[serde(default)]
	linked_accounts: Vec<LinkedAccount>,
}

#[derive(Debug, Deserialize)]
struct LinkedAccount {
	#[serde(rename = "type")]
	kind: String,
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	address: Option<String>,
	#[serde(default)]
	chain_type: Option<String>,
	#[serde(default)]
	wallet_client_type: Option<String>,
}

impl LinkedAccount {
	fn is_embedded_ethereum_wallet(&self) -> bool {
		self.kind == "wallet"
			&& self.wallet_client_type.as_deref() == Some("privy")
			&& self.chain_type.as_deref().unwrap_or("ethereum") == "ethereum"
	}
}

/// Picks the embedded wallet of a user.
///
/// Only provider-managed wallets can be driven by the server, so external
/// wallets linked by the user are ignored.
fn select_wallet(user: &PrivyUser, telegram_user_id: &str) -> Result<Wallet, AccountError> {
	let account = user
		.linked_accounts
		.iter()
		.find(|a| a.is_embedded_ethereum_wallet())
		.ok_or_else(|| AccountError::NotFound(telegram_user_id.to_string()))?;

	let id = account
		.id
		.clone()
		.ok_or_else(|| AccountError::NotFound(telegram_user_id.to_string()))?;
	let address = account
		.address
		.as_deref()
		.ok_or_else(|| AccountError::InvalidResponse("wallet without address".to_string()))?
		.parse::<Address>()
		.map_err(|e| AccountError::InvalidResponse(format!("wallet address: {}", e)))?;

	Ok(Wallet { id, address })
}

pub struct PrivyAccounts {
	client: reqwest::Client,
	api_url: String,
	app_id: String,
	app_secret: String,
}

impl PrivyAccounts {
	pub fn new(
		api_url: impl Into<String>,
		app_id: impl Into<String>,
		app_secret: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, AccountError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AccountError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			api_url: api_url.into().trim_end_matches('/').to_string(),
			app_id: app_id.into(),
			app_secret: app_secret.into(),
		})
	}
}

/// Configuration schema for PrivyAccounts.
pub struct PrivyAccountsSchema;

impl ConfigSchema for PrivyAccountsSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		let non_empty = |value: &serde_json::Value| match value.as_str() {
			Some(s) if !s.trim().is_empty() => Ok(()),
			_ => Err("must not be empty".to_string()),
		};
		let schema = Schema::new(
			vec![
				Field::new("app_id", FieldType::String).with_validator(non_empty),
				Field::new("app_secret", FieldType::String).with_validator(non_empty),
			],
			vec![
				Field::new("api_url", FieldType::String).with_validator(|value| {
					let url = value.as_str().unwrap_or_default();
					if url.starts_with("http://") || url.starts_with("https://") {
						Ok(())
					} else {
						Err("API URL must start with http:// or https://".to_string())
					}
				}),
				Field::new(
					"timeout_secs",
					FieldType::Integer {
						min: Some(1),
						max: Some(120),
					},
				),
			],
		);
		schema.validate_toml(config)
	}
}

#[async_trait]
impl AccountInterface for PrivyAccounts {
	async fn wallet_for_telegram_user(
		&self,
		telegram_user_id: &str,
	) -> Result<Wallet, AccountError> {
		let url = format!("{}/users/telegram/telegram_user_id", self.api_url);

		let response = self
			.client
			.post(&url)
			.basic_auth(&self.app_id, Some(&self.app_secret))
			.header("privy-app-id", &self.app_id)
			.json(&serde_json::json!({ "telegram_user_id": telegram_user_id }))
			.send()
			.await
			.map_err(|e| AccountError::Provider(e.to_string()))?;

		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			return Err(AccountError::NotFound(telegram_user_id.to_string()));
		}
		if !status.is_success() {
			return Err(AccountError::Provider(format!(
				"user lookup returned {}",
				status
			)));
		}

		let user: PrivyUser = response
			.json()
			.await
			.map_err(|e| AccountError::InvalidResponse(e.to_string()))?;

		let wallet = select_wallet(&user, telegram_user_id)?;
		tracing::debug!(user_id = %telegram_user_id, wallet = %wallet.address, "Resolved custodial wallet");
		Ok(wallet)
	}
}

/// Factory function to create the Privy provider from configuration.
///
/// Configuration parameters:
/// - `app_id`, `app_secret`: Privy application credentials
/// - `api_url`: optional API base URL
/// - `timeout_secs`: optional request timeout (default 10)
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	PrivyAccountsSchema
		.validate(config)
		.map_err(|e| AccountError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str()).unwrap_or_default();
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);
	let timeout = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as u64;

	Ok(Box::new(PrivyAccounts::new(
		api_url,
		get("app_id"),
		get("app_secret"),
		Duration::from_secs(timeout),
	)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{http::HeaderMap, routing::post, Json, Router};
	use serde_json::{json, Value};

	fn user(accounts: Value) -> PrivyUser {
		serde_json::from_value(json!({ "id": "did:privy:1", "linked_accounts": accounts })).unwrap()
	}

	#[test]
	fn test_selects_embedded_wallet() {
		let user = user(json!([
			{ "type": "telegram", "telegram_user_id": "42" },
			{ "type": "wallet", "address": "0x2222222222222222222222222222222222222222", "wallet_client_type": "metamask", "chain_type": "ethereum" },
			{ "type": "wallet", "id": "w-1", "address": "0x1111111111111111111111111111111111111111", "wallet_client_type": "privy", "chain_type": "ethereum" }
		]));

		let wallet = select_wallet(&user, "42").unwrap();
		assert_eq!(wallet.id, "w-1");
		assert_eq!(
			wallet.address,
			"0x1111111111111111111111111111111111111111".parse::<Address>().unwrap()
		);
	}

	#[test]
	fn test_no_embedded_wallet() {
		let user = user(json!([
			{ "type": "wallet", "id": "w-2", "address": "0x2222222222222222222222222222222222222222", "wallet_client_type": "privy", "chain_type": "solana" }
		]));
		assert!(matches!(
			select_wallet(&user, "42"),
			Err(AccountError::NotFound(_))
		));
	}

	#[test]
	fn test_schema_requires_credentials() {
		let config: toml::Value = toml::from_str("app_id = \"\"").unwrap();
		let errors = PrivyAccountsSchema.validate(&config).unwrap_err();
		assert_eq!(errors.fields(), vec!["app_id", "app_secret"]);
	}

	async fn lookup(headers: HeaderMap, Json(body): Json<Value>) -> axum::response::Response {
		use axum::response::IntoResponse;

		if headers.get("privy-app-id").and_then(|v| v.to_str().ok()) != Some("app") {
			return axum::http::StatusCode::UNAUTHORIZED.into_response();
		}
		match body["telegram_user_id"].as_str() {
			Some("42") => Json(json!({
				"id": "did:privy:1",
				"linked_accounts": [{
					"type": "wallet",
					"id": "w-42",
					"address": "0x4242424242424242424242424242424242424242",
					"wallet_client_type": "privy",
					"chain_type": "ethereum"
				}]
			}))
			.into_response(),
			_ => axum::http::StatusCode::NOT_FOUND.into_response(),
		}
	}

	#[tokio::test]
	async fn test_http_lookup() {
		let app = Router::new().route("/api/v1/users/telegram/telegram_user_id", post(lookup));
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		let accounts = PrivyAccounts::new(
			format!("http://{}/api/v1/", addr),
			"app",
			"secret",
			Duration::from_secs(5),
		)
		.unwrap();

		let wallet = accounts.wallet_for_telegram_user("42").await.unwrap();
		assert_eq!(wallet.id, "w-42");

		assert!(matches!(
			accounts.wallet_for_telegram_user("7").await,
			Err(AccountError::NotFound(_))
		));
	}
}
