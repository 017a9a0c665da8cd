//! Privy wallet RPC: `eth_sendTransaction` from an embedded wallet.

use crate::{DeliveryError, DeliveryInterface};
use async_trait::async_trait;
use bot_types::{
	ConfigSchema, Field, FieldType, Network, Schema, Transaction, TransactionHash,
	ValidationErrors, Wallet,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.privy.io/v1";

#[derive(Debug, Deserialize)]
struct RpcResponse {
	data: RpcData,
}

#[derive(Debug, Deserialize)]
struct RpcData {
	hash: String,
}

pub struct PrivyDelivery {
	client: reqwest::Client,
	api_url: String,
	app_id: String,
	app_secret: String,
}

impl PrivyDelivery {
	pub fn new(
		api_url: impl Into<String>,
		app_id: impl Into<String>,
		app_secret: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, DeliveryError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| DeliveryError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			api_url: api_url.into().trim_end_matches('/').to_string(),
			app_id: app_id.into(),
			app_secret: app_secret.into(),
		})
	}
}

/// Only chains the bot knows are submitted.
fn request_body(tx: &Transaction) -> Result<serde_json::Value, DeliveryError> {
	let network = Network::from_chain_id(tx.chain_id).ok_or_else(|| {
		DeliveryError::Rejected(format!("unsupported chain id {}", tx.chain_id))
	})?;
	Ok(json!({
		"method": "eth_sendTransaction",
		"caip2": network.caip2(),
		"chain_type": "ethereum",
		"params": {
			"transaction": {
				"to": tx.to.to_string(),
				"data": tx.data_hex(),
				"value": format!("{:#x}", tx.value),
				"chain_id": tx.chain_id,
			}
		}
	}))
}

#[async_trait]
impl DeliveryInterface for PrivyDelivery {
	async fn submit(
		&self,
		wallet: &Wallet,
		tx: &Transaction,
		idempotency_key: &str,
	) -> Result<TransactionHash, DeliveryError> {
		let body = request_body(tx)?;
		let url = format!("{}/wallets/{}/rpc", self.api_url, wallet.id);

		let response = self
			.client
			.post(&url)
			.basic_auth(&self.app_id, Some(&self.app_secret))
			.header("privy-app-id", &self.app_id)
			.header("privy-idempotency-key", idempotency_key)
			.json(&body)
			.send()
			.await
			.map_err(|e| DeliveryError::Network(e.to_string()))?;

		let status = response.status();
		if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
			let body = response.text().await.unwrap_or_default();
			return Err(DeliveryError::Rejected(format!("{}: {}", status, body)));
		}
		if !status.is_success() {
			return Err(DeliveryError::Network(format!("provider returned {}", status)));
		}

		let parsed: RpcResponse = response
			.json()
			.await
			.map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
		let hash = hex::decode(parsed.data.hash.trim_start_matches("0x"))
			.map_err(|e| DeliveryError::InvalidResponse(format!("hash: {}", e)))?;

		Ok(TransactionHash(hash))
	}
}

/// Configuration schema for PrivyDelivery.
pub struct PrivyDeliverySchema;

impl ConfigSchema for PrivyDeliverySchema {
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
				Field::new("api_url", FieldType::String),
				Field::new(
					"timeout_secs",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate_toml(config)
	}
}

/// Factory function to create the Privy delivery provider from configuration.
///
/// Configuration parameters:
/// - `app_id`, `app_secret`: Privy application credentials
/// - `api_url`: optional wallet API base URL
/// - `timeout_secs`: optional request timeout (default 30)
pub fn create_delivery(config: &toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	PrivyDeliverySchema
		.validate(config)
		.map_err(|e| DeliveryError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str()).unwrap_or_default();
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);
	let timeout = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	Ok(Box::new(PrivyDelivery::new(
		api_url,
		get("app_id"),
		get("app_secret"),
		Duration::from_secs(timeout),
	)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{Address, U256};
	use axum::{extract::Path, http::HeaderMap, routing::post, Json, Router};
	use serde_json::Value;
	use std::sync::{Arc, Mutex};

	type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

	async fn serve(seen: Seen) -> String {
		let app = Router::new().route(
			"/v1/wallets/{id}/rpc",
			post(
				move |Path(id): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
					let seen = seen.clone();
					async move {
						let key = headers
							.get("privy-idempotency-key")
							.and_then(|v| v.to_str().ok())
							.map(str::to_string);
						seen.lock().unwrap().push((id.clone(), key, body));
						if id == "broke" {
							return (
								axum::http::StatusCode::BAD_REQUEST,
								Json(json!({ "error": "insufficient funds" })),
							);
						}
						(
							axum::http::StatusCode::OK,
							Json(json!({
								"method": "eth_sendTransaction",
								"data": { "hash": "0xabcd", "caip2": "eip155:8453" }
							})),
						)
					}
				},
			),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}/v1", addr)
	}

	fn tx() -> Transaction {
		Transaction {
			to: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap(),
			data: vec![0xa9, 0x05, 0x9c, 0xbb],
			value: U256::ZERO,
			chain_id: 8453,
			label: "transfer".to_string(),
		}
	}

	#[tokio::test]
	async fn test_submit_sends_rpc_request() {
		let seen: Seen = Arc::default();
		let url = serve(seen.clone()).await;
		let delivery = PrivyDelivery::new(url, "app", "secret", Duration::from_secs(5)).unwrap();
		let wallet = Wallet {
			id: "w-42".to_string(),
			address: Address::ZERO,
		};

		let hash = delivery.submit(&wallet, &tx(), "key-0").await.unwrap();
		assert_eq!(hash.to_string(), "0xabcd");

		let seen = seen.lock().unwrap();
		let (id, key, body) = &seen[0];
		assert_eq!(id, "w-42");
		assert_eq!(key.as_deref(), Some("key-0"));
		assert_eq!(body["method"], "eth_sendTransaction");
		assert_eq!(body["caip2"], "eip155:8453");
		assert_eq!(body["params"]["transaction"]["data"], "0xa9059cbb");
		assert_eq!(body["params"]["transaction"]["value"], "0x0");
	}

	#[tokio::test]
	async fn test_client_error_is_rejection() {
		let url = serve(Arc::default()).await;
		let delivery = PrivyDelivery::new(url, "app", "secret", Duration::from_secs(5)).unwrap();
		let wallet = Wallet {
			id: "broke".to_string(),
			address: Address::ZERO,
		};

		assert!(matches!(
			delivery.submit(&wallet, &tx(), "key-0").await,
			Err(DeliveryError::Rejected(_))
		));
	}

	#[tokio::test]
	async fn test_unknown_chain_is_not_submitted() {
		let seen: Seen = Arc::default();
		let url = serve(seen.clone()).await;
		let delivery = PrivyDelivery::new(url, "app", "secret", Duration::from_secs(5)).unwrap();
		let wallet = Wallet {
			id: "w-42".to_string(),
			address: Address::ZERO,
		};
		let mut optimism = tx();
		optimism.chain_id = 10;

		assert!(matches!(
			delivery.submit(&wallet, &optimism, "key-0").await,
			Err(DeliveryError::Rejected(reason)) if reason.contains("10")
		));
		assert!(seen.lock().unwrap().is_empty());
	}

	#[test]
	fn test_factory_requires_credentials() {
		let config: toml::Value = toml::from_str("app_id = \"app\"").unwrap();
		assert!(matches!(
			create_delivery(&config),
			Err(DeliveryError::Configuration(_))
		));
	}
}
