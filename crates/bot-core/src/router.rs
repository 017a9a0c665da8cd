//! Dispatch of webhook updates.

use crate::error::StepError;
use crate::flow::{ConversationFlow, Sender};
use crate::messages;
use crate::session::SessionStore;
use bot_telegram::MessengerService;
use bot_types::{Action, CallbackAction, CallbackQuery, Message, OutboundMessage, Update};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A text command, with any `@botname` suffix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Start,
	Account,
	Flow(Action),
	Help,
	Unknown(String),
}

impl Command {
	/// Parses the first word of a message that starts with `/`.
	pub fn parse(text: &str) -> Option<Command> {
		if !text.starts_with('/') {
			return None;
		}
		let word = text.split_whitespace().next()?;
		let name = word.split('@').next().unwrap_or(word);
		Some(match name {
			"/start" => Command::Start,
			"/account" => Command::Account,
			"/send" => Command::Flow(Action::Send),
			"/transfer" => Command::Flow(Action::Transfer),
			"/buy" => Command::Flow(Action::Buy),
			"/help" => Command::Help,
			_ => Command::Unknown(name.to_string()),
		})
	}
}

pub struct Router {
	flow: ConversationFlow,
	sessions: Arc<SessionStore>,
	messenger: Arc<MessengerService>,
	webapp_url: Option<String>,
}

impl Router {
	pub fn new(
		flow: ConversationFlow,
		sessions: Arc<SessionStore>,
		messenger: Arc<MessengerService>,
		webapp_url: Option<String>,
	) -> Self {
		Self {
			flow,
			sessions,
			messenger,
			webapp_url,
		}
	}

	/// Handles one update, sending at most one message.
	pub async fn handle_update(&self, update: Update) {
		if let Some(callback) = update.callback_query {
			self.handle_callback(callback).await;
		} else if let Some(message) = update.message {
			self.handle_message(message).await;
		} else {
			debug!(update_id = update.update_id, "Ignoring update without message or callback");
		}
	}

	async fn handle_callback(&self, callback: CallbackQuery) {
		if let Err(e) = self.messenger.answer_callback(&callback.id).await {
			warn!(callback_id = %callback.id, error = %e, "Failed to answer callback query");
		}

		let Some(data) = callback.data.as_deref() else {
			debug!(callback_id = %callback.id, "Callback without data");
			return;
		};
		let sender = Sender {
			chat_id: callback
				.message
				.as_ref()
				.map(|m| m.chat.id)
				.unwrap_or(callback.from.id),
			user_id: callback.from.id.to_string(),
		};

		let _guard = self.sessions.lock(&sender.user_id).await;
		let result = match data.parse::<CallbackAction>() {
			Ok(action) => {
				debug!(user_id = %sender.user_id, callback = %action, "Callback");
				self.flow.on_callback(&sender, action).await
			}
			Err(e) => {
				warn!(user_id = %sender.user_id, error = %e, "Unrecognized callback data");
				Err(StepError::Lookup(messages::session_expired()))
			}
		};
		self.respond(&sender, result).await;
	}

	async fn handle_message(&self, message: Message) {
		let (Some(text), Some(from)) = (message.text.as_deref(), message.from.as_ref()) else {
			debug!(message_id = message.message_id, "Ignoring message without text or sender");
			return;
		};
		let sender = Sender {
			chat_id: message.chat.id,
			user_id: from.id.to_string(),
		};

		let _guard = self.sessions.lock(&sender.user_id).await;
		let result = match Command::parse(text) {
			Some(command) => self.run_command(&sender, command).await,
			None => self.continue_session(&sender, text).await,
		};
		self.respond(&sender, result).await;
	}

	/// Free text goes to the active session, if there is one.
	async fn continue_session(&self, sender: &Sender, text: &str) -> Result<OutboundMessage, StepError> {
		match self.sessions.get(&sender.user_id).await {
			Ok(Some(session)) => self.flow.on_text(sender, session, text).await,
			Ok(None) => Ok(messages::fallback(sender.chat_id)),
			Err(e) => {
				warn!(user_id = %sender.user_id, error = %e, "Discarding unreadable session");
				Err(StepError::Lookup(messages::session_expired()))
			}
		}
	}

	async fn run_command(&self, sender: &Sender, command: Command) -> Result<OutboundMessage, StepError> {
		match command {
			Command::Start => Ok(messages::welcome(sender.chat_id, self.webapp_url.as_deref())),
			Command::Help => Ok(messages::help(sender.chat_id)),
			Command::Account => {
				let wallet = self.flow.wallet_for(sender).await?;
				let balances = self.flow.balances().balances(wallet.address).await;
				Ok(messages::account_summary(
					sender.chat_id,
					&wallet.address.to_string(),
					&balances,
				))
			}
			Command::Flow(action) => self.flow.start(sender, action).await,
			Command::Unknown(name) => Ok(messages::unknown_command(sender.chat_id, &name)),
		}
	}

	/// Renders a step outcome as the one reply of the update.
	async fn respond(&self, sender: &Sender, result: Result<OutboundMessage, StepError>) {
		let reply = match result {
			Ok(reply) => reply,
			Err(StepError::User(prompt)) => {
				OutboundMessage::text(sender.chat_id, format!("❌ {}", prompt))
			}
			Err(StepError::Lookup(text)) => {
				self.clear_session(sender).await;
				OutboundMessage::text(sender.chat_id, format!("❌ {}", text))
			}
			Err(StepError::Upstream(detail)) => {
				error!(user_id = %sender.user_id, error = %detail, "Step failed");
				self.clear_session(sender).await;
				OutboundMessage::text(sender.chat_id, messages::SERVICE_ERROR)
			}
		};

		if let Err(e) = self.messenger.send(&reply).await {
			error!(chat_id = sender.chat_id, error = %e, "Failed to send reply");
		}
	}

	async fn clear_session(&self, sender: &Sender) {
		if let Err(e) = self.sessions.delete(&sender.user_id).await {
			warn!(user_id = %sender.user_id, error = %e, "Failed to clear session");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_command_parsing() {
		assert_eq!(Command::parse("/start"), Some(Command::Start));
		assert_eq!(Command::parse("/send@usdc_wallet_bot"), Some(Command::Flow(Action::Send)));
		assert_eq!(Command::parse("/buy now"), Some(Command::Flow(Action::Buy)));
		assert_eq!(Command::parse("  /help"), None);
		assert_eq!(
			Command::parse("/withdraw"),
			Some(Command::Unknown("/withdraw".to_string()))
		);
		assert_eq!(Command::parse("hello"), None);
		assert_eq!(Command::parse("0x1111111111111111111111111111111111111111"), None);
		assert_eq!(Command::parse(""), None);
	}
}
