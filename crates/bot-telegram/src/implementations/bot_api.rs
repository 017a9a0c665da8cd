//! HTTPS client for `https://api.telegram.org/bot<token>/<method>`.

use crate::{MessengerError, MessengerInterface};
use async_trait::async_trait;
use bot_types::{ConfigSchema, Field, FieldType, OutboundMessage, Schema, ValidationErrors};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
	ok: bool,
	#[serde(default)]
	error_code: Option<i64>,
	#[serde(default)]
	description: Option<String>,
}

pub struct TelegramBotApi {
	client: reqwest::Client,
	api_url: String,
	token: String,
}

impl TelegramBotApi {
	pub fn new(
		api_url: impl Into<String>,
		token: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, MessengerError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| MessengerError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			api_url: api_url.into().trim_end_matches('/').to_string(),
			token: token.into(),
		})
	}

	async fn call(&self, method: &str, body: serde_json::Value) -> Result<(), MessengerError> {
		let url = format!("{}/bot{}/{}", self.api_url, self.token, method);

		// The token is part of the URL, so reqwest errors are logged without it.
		let response = self
			.client
			.post(&url)
			.json(&body)
			.send()
			.await
			.map_err(|e| MessengerError::Http(e.without_url().to_string()))?;

		let status = response.status();
		let envelope: ApiResponse = response
			.json()
			.await
			.map_err(|e| MessengerError::InvalidResponse(format!("{} ({})", e.without_url(), status)))?;

		if envelope.ok {
			Ok(())
		} else {
			Err(MessengerError::Api {
				code: envelope
					.error_code
					.unwrap_or_else(|| i64::from(status.as_u16())),
				description: envelope.description.unwrap_or_default(),
			})
		}
	}
}

#[async_trait]
impl MessengerInterface for TelegramBotApi {
	async fn send_message(&self, message: &OutboundMessage) -> Result<(), MessengerError> {
		let body =
			serde_json::to_value(message).map_err(|e| MessengerError::InvalidResponse(e.to_string()))?;
		self.call("sendMessage", body).await?;
		tracing::debug!(chat_id = message.chat_id, "Sent message");
		Ok(())
	}

	async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), MessengerError> {
		self.call(
			"answerCallbackQuery",
			json!({ "callback_query_id": callback_query_id }),
		)
		.await
	}

	async fn set_webhook(
		&self,
		url: &str,
		secret_token: Option<&str>,
	) -> Result<(), MessengerError> {
		let mut body = json!({
			"url": url,
			"allowed_updates": ["message", "callback_query"],
		});
		if let Some(secret) = secret_token {
			body["secret_token"] = json!(secret);
		}
		self.call("setWebhook", body).await
	}
}

/// Configuration schema for TelegramBotApi.
pub struct TelegramBotApiSchema;

impl ConfigSchema for TelegramBotApiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		let schema = Schema::new(
			vec![Field::new("bot_token", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(token) if token.contains(':') => Ok(()),
					_ => Err("expected <bot id>:<secret>".to_string()),
				}
			})],
			vec![
				Field::new("api_url", FieldType::String),
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

/// Factory function to create the Bot API client from configuration.
///
/// Configuration parameters:
/// - `bot_token`: token issued by BotFather
/// - `api_url`: optional Bot API server (default `https://api.telegram.org`)
/// - `timeout_secs`: optional request timeout (default 10)
pub fn create_messenger(config: &toml::Value) -> Result<Box<dyn MessengerInterface>, MessengerError> {
	TelegramBotApiSchema
		.validate(config)
		.map_err(|e| MessengerError::Configuration(e.to_string()))?;

	let token = config
		.get("bot_token")
		.and_then(|v| v.as_str())
		.unwrap_or_default();
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);
	let timeout = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as u64;

	Ok(Box::new(TelegramBotApi::new(
		api_url,
		token,
		Duration::from_secs(timeout),
	)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{extract::Path, routing::post, Json, Router};
	use bot_types::{CallbackAction, InlineKeyboardButton, InlineKeyboardMarkup};
	use serde_json::Value;
	use std::sync::{Arc, Mutex};

	type Calls = Arc<Mutex<Vec<(String, Value)>>>;

	async fn serve(calls: Calls) -> String {
		let app = Router::new().route(
			"/{bot}/{method}",
			post(move |Path((bot, method)): Path<(String, String)>, Json(body): Json<Value>| {
				let calls = calls.clone();
				async move {
					if bot != "bot123:abc" {
						return Json(json!({ "ok": false, "error_code": 401, "description": "Unauthorized" }));
					}
					calls.lock().unwrap().push((method, body));
					Json(json!({ "ok": true, "result": true }))
				}
			}),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}", addr)
	}

	#[tokio::test]
	async fn test_send_message_with_keyboard() {
		let calls: Calls = Arc::default();
		let url = serve(calls.clone()).await;
		let api = TelegramBotApi::new(url, "123:abc", Duration::from_secs(5)).unwrap();

		let message = OutboundMessage::text(42, "Select network").with_keyboard(
			InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
				"Cancel",
				CallbackAction::Cancel,
			)]]),
		);
		api.send_message(&message).await.unwrap();
		api.answer_callback_query("cb-1").await.unwrap();
		api.set_webhook("https://bot.example.com/hook", Some("s3cret"))
			.await
			.unwrap();

		let calls = calls.lock().unwrap();
		assert_eq!(calls[0].0, "sendMessage");
		assert_eq!(calls[0].1["chat_id"], 42);
		assert_eq!(
			calls[0].1["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
			"cancel"
		);
		assert_eq!(calls[1].0, "answerCallbackQuery");
		assert_eq!(calls[1].1["callback_query_id"], "cb-1");
		assert_eq!(calls[2].0, "setWebhook");
		assert_eq!(calls[2].1["secret_token"], "s3cret");
		assert_eq!(
			calls[2].1["allowed_updates"],
			json!(["message", "callback_query"])
		);
	}

	#[tokio::test]
	async fn test_api_error_is_surfaced() {
		let url = serve(Arc::default()).await;
		let api = TelegramBotApi::new(url, "999:wrong", Duration::from_secs(5)).unwrap();

		let err = api
			.send_message(&OutboundMessage::text(1, "hi"))
			.await
			.unwrap_err();
		assert!(matches!(err, MessengerError::Api { code: 401, .. }));
	}

	#[test]
	fn test_factory_rejects_malformed_token() {
		let config: toml::Value = toml::from_str("bot_token = \"nocolon\"").unwrap();
		assert!(matches!(
			create_messenger(&config),
			Err(MessengerError::Configuration(_))
		));
	}
}
