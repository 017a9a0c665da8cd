//! Subset of the Telegram Bot API wire types used by the bot.

use crate::CallbackAction;
use serde::{Deserialize, Serialize};

/// Incoming update delivered to the webhook.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Update {
	pub update_id: i64,
	#[serde(default)]
	pub message: Option<Message>,
	#[serde(default)]
	pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
	pub message_id: i64,
	#[serde(default)]
	pub from: Option<User>,
	pub chat: Chat,
	#[serde(default)]
	pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
	pub id: i64,
	#[serde(default)]
	pub is_bot: bool,
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
	pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
	pub id: String,
	pub from: User,
	#[serde(default)]
	pub message: Option<Message>,
	#[serde(default)]
	pub data: Option<String>,
}

/// Body of a `sendMessage` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
	pub chat_id: i64,
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl OutboundMessage {
	pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
		Self {
			chat_id,
			text: text.into(),
			reply_markup: None,
		}
	}

	pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
		self.reply_markup = Some(keyboard);
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InlineKeyboardMarkup {
	pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
	pub fn new(rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
		Self {
			inline_keyboard: rows,
		}
	}

	/// All buttons, row by row.
	pub fn buttons(&self) -> impl Iterator<Item = &InlineKeyboardButton> {
		self.inline_keyboard.iter().flatten()
	}
}

/// A button is either a callback button or a Web App launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub callback_data: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub web_app: Option<WebAppInfo>,
}

impl InlineKeyboardButton {
	pub fn callback(text: impl Into<String>, action: CallbackAction) -> Self {
		Self {
			text: text.into(),
			callback_data: Some(action.to_string()),
			web_app: None,
		}
	}

	pub fn web_app(text: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			callback_data: None,
			web_app: Some(WebAppInfo { url: url.into() }),
		}
	}

	/// Decoded payload of a callback button.
	pub fn action(&self) -> Option<CallbackAction> {
		self.callback_data.as_deref().and_then(|d| d.parse().ok())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAppInfo {
	pub url: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_parse_callback_update() {
		let update: Update = serde_json::from_value(json!({
			"update_id": 10,
			"callback_query": {
				"id": "cb-1",
				"from": { "id": 42, "is_bot": false, "first_name": "Ada" },
				"message": {
					"message_id": 5,
					"chat": { "id": 42, "type": "private" },
					"text": "Select a network"
				},
				"data": "cancel"
			}
		}))
		.unwrap();

		let query = update.callback_query.unwrap();
		assert_eq!(query.from.id, 42);
		assert_eq!(query.message.unwrap().chat.id, 42);
		assert_eq!(query.data.as_deref(), Some("cancel"));
		assert!(update.message.is_none());
	}

	#[test]
	fn test_keyboard_serialization() {
		let message = OutboundMessage::text(1, "hi").with_keyboard(InlineKeyboardMarkup::new(vec![
			vec![InlineKeyboardButton::callback("Cancel", CallbackAction::Cancel)],
			vec![InlineKeyboardButton::web_app("Open", "https://example.org")],
		]));

		assert_eq!(
			serde_json::to_value(&message).unwrap(),
			json!({
				"chat_id": 1,
				"text": "hi",
				"reply_markup": {
					"inline_keyboard": [
						[{ "text": "Cancel", "callback_data": "cancel" }],
						[{ "text": "Open", "web_app": { "url": "https://example.org" } }]
					]
				}
			})
		);
	}
}
