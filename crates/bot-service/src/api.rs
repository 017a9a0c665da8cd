//! Webhook endpoint and health probe.

use axum::{
	extract::State,
	http::{HeaderMap, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use bot_core::BotEngine;
use bot_types::Update;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Header Telegram echoes the `secret_token` of `setWebhook` in.
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct AppState {
	engine: Arc<BotEngine>,
}

pub fn router(engine: Arc<BotEngine>) -> Router {
	let webhook_path = engine.config().bot.webhook_path.clone();
	Router::new()
		.route("/health", get(health_check))
		.route(&webhook_path, post(handle_update))
		.with_state(AppState { engine })
		.layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<Value> {
	Json(json!({ "status": "ok" }))
}

/// Handles one update before answering, so Telegram holds back the user's
/// next update until this one is done.
///
/// Undecodable bodies are still answered with 200: Telegram would otherwise
/// keep redelivering them.
async fn handle_update(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
	if let Some(secret) = state.engine.config().bot.webhook_secret.as_deref() {
		let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
		if presented != Some(secret) {
			warn!("Rejected webhook call with a missing or wrong secret token");
			return Err(StatusCode::UNAUTHORIZED);
		}
	}

	match serde_json::from_value::<Update>(body) {
		Ok(update) => state.engine.handle_update(update).await,
		Err(e) => warn!(error = %e, "Ignoring undecodable update"),
	}
	Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::Request;
	use tower::ServiceExt;

	fn engine(extra: &str) -> Arc<BotEngine> {
		let config = format!(
			r#"
[bot]
{}

[telegram]
bot_token = "123:abc"
api_url = "http://127.0.0.1:9"
timeout_secs = 1

[storage]
backend = "memory"

[account]
provider = "local"
"#,
			extra
		);
		let config: bot_config::Config = toml::from_str(&config).unwrap();
		Arc::new(crate::build_engine(config).unwrap())
	}

	fn post_update(secret: Option<&str>, body: &str) -> Request<Body> {
		let mut request = Request::builder()
			.method("POST")
			.uri("/api/telegram/bot/webhook")
			.header("content-type", "application/json");
		if let Some(secret) = secret {
			request = request.header(SECRET_HEADER, secret);
		}
		request.body(Body::from(body.to_string())).unwrap()
	}

	async fn body_json(response: axum::response::Response) -> Value {
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		serde_json::from_slice(&bytes).unwrap()
	}

	#[tokio::test]
	async fn test_health() {
		let response = router(engine(""))
			.oneshot(Request::get("/health").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_json(response).await, json!({ "status": "ok" }));
	}

	#[tokio::test]
	async fn test_webhook_acknowledges_updates() {
		let app = router(engine(""));

		let response = app
			.clone()
			.oneshot(post_update(None, r#"{"update_id": 1}"#))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(body_json(response).await, json!({}));

		// Wrong shape, still acknowledged.
		let response = app
			.oneshot(post_update(None, r#"{"update_id": "one"}"#))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_webhook_secret() {
		let app = router(engine("webhook_secret = \"s3cret\""));

		for secret in [None, Some("guess")] {
			let response = app
				.clone()
				.oneshot(post_update(secret, r#"{"update_id": 1}"#))
				.await
				.unwrap();
			assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		}

		let response = app
			.oneshot(post_update(Some("s3cret"), r#"{"update_id": 1}"#))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}
}
