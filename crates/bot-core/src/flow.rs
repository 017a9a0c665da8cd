//! Buy, send and transfer conversations.
//!
//! ```text
//! network (button) -> [destination (button, transfer)] -> [address (text, send)]
//!     -> amount (text) -> confirm | cancel (button, any step)
//! ```
//!
//! Each handler returns the single reply for the update, or a [`StepError`]
//! the router renders.

use crate::error::StepError;
use crate::messages;
use crate::session::SessionStore;
use bot_account::{AccountError, AccountService};
use bot_balance::BalanceService;
use bot_order::OrderService;
use bot_queue::QueueService;
use bot_types::{
	is_decimal_amount, is_hex_address, Action, CallbackAction, Network, OutboundMessage, Step,
	UserSession,
};
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Smallest purchase accepted by the onramp, exclusive.
const MIN_BUY_AMOUNT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Who an update came from and where to answer.
#[derive(Debug, Clone)]
pub struct Sender {
	pub chat_id: i64,
	pub user_id: String,
}

pub struct ConversationFlow {
	sessions: Arc<SessionStore>,
	accounts: Arc<AccountService>,
	balances: Arc<BalanceService>,
	orders: Arc<OrderService>,
	queue: Arc<QueueService>,
}

/// Accepts `^\d+(\.\d{1,2})?$` strictly above zero, and above $5 for buys.
pub fn is_valid_amount(action: Action, amount: &str) -> bool {
	if !is_decimal_amount(amount) {
		return false;
	}
	let Ok(value) = Decimal::from_str(amount) else {
		return false;
	};
	match action {
		Action::Buy => value > MIN_BUY_AMOUNT,
		Action::Send | Action::Transfer => value > Decimal::ZERO,
	}
}

impl ConversationFlow {
	pub fn new(
		sessions: Arc<SessionStore>,
		accounts: Arc<AccountService>,
		balances: Arc<BalanceService>,
		orders: Arc<OrderService>,
		queue: Arc<QueueService>,
	) -> Self {
		Self {
			sessions,
			accounts,
			balances,
			orders,
			queue,
		}
	}

	/// Starts a flow from its command, dropping any unfinished one.
	pub async fn start(&self, sender: &Sender, action: Action) -> Result<OutboundMessage, StepError> {
		self.sessions.delete(&sender.user_id).await?;
		Ok(messages::choose_network(sender.chat_id, action))
	}

	pub async fn on_callback(
		&self,
		sender: &Sender,
		callback: CallbackAction,
	) -> Result<OutboundMessage, StepError> {
		match callback {
			CallbackAction::SelectNetwork { action, network } => {
				self.select_network(sender, action, network).await
			}
			CallbackAction::SelectDestination { network } => {
				self.select_destination(sender, network).await
			}
			CallbackAction::Confirm { action } => self.confirm(sender, action).await,
			CallbackAction::Cancel => self.cancel(sender).await,
		}
	}

	/// Free text from a user with an active session.
	///
	/// Input is checked exactly as typed; surrounding whitespace re-prompts.
	pub async fn on_text(
		&self,
		sender: &Sender,
		mut session: UserSession,
		text: &str,
	) -> Result<OutboundMessage, StepError> {
		match session.step {
			Some(step) if !step.accepts_text() => Err(StepError::User(messages::use_buttons())),
			Some(Step::Address) if session.action == Action::Send => {
				if !is_hex_address(text) {
					return Err(StepError::User(messages::invalid_address()));
				}
				session.address = Some(text.to_string());
				session.step = Some(Step::Amount);
				self.sessions.set(&sender.user_id, &session).await?;
				Ok(messages::amount_prompt(sender.chat_id, &session))
			}
			Some(Step::Amount) => {
				if !is_valid_amount(session.action, text) {
					return Err(StepError::User(messages::invalid_amount(session.action)));
				}
				session.amount = Some(text.to_string());
				session.step = Some(Step::Confirm);
				self.sessions.set(&sender.user_id, &session).await?;
				Ok(messages::confirm_prompt(sender.chat_id, &session))
			}
			_ => Err(StepError::Lookup(messages::session_expired())),
		}
	}

	/// Best-effort balance shown next to the chosen network.
	async fn balance_hint(&self, user_id: &str, network: Network) -> Option<String> {
		match self.accounts.wallet(user_id).await {
			Ok(wallet) => Some(self.balances.balance(network, wallet.address).await),
			Err(e) => {
				debug!(user_id = %user_id, error = %e, "Skipping balance hint");
				None
			}
		}
	}

	async fn select_network(
		&self,
		sender: &Sender,
		action: Action,
		network: Network,
	) -> Result<OutboundMessage, StepError> {
		if !action.allowed_networks().contains(&network) {
			return Err(StepError::User(format!(
				"{} is not available for {}.",
				network.display_name(),
				action
			)));
		}

		let mut session = UserSession::new(action);
		let reply = match action {
			Action::Buy => {
				session.network = Some(network);
				session.step = Some(Step::Amount);
				messages::amount_prompt(sender.chat_id, &session)
			}
			Action::Send => {
				session.network = Some(network);
				session.step = Some(Step::Address);
				let balance = self.balance_hint(&sender.user_id, network).await;
				messages::address_prompt(sender.chat_id, network, balance.as_deref())
			}
			Action::Transfer => {
				session.source_network = Some(network);
				session.step = Some(Step::Destination);
				let balance = self.balance_hint(&sender.user_id, network).await;
				messages::destination_prompt(sender.chat_id, network, balance.as_deref())
			}
		};

		self.sessions.set(&sender.user_id, &session).await?;
		debug!(user_id = %sender.user_id, action = %action, network = %network, "Flow started");
		Ok(reply)
	}

	async fn select_destination(
		&self,
		sender: &Sender,
		network: Network,
	) -> Result<OutboundMessage, StepError> {
		let mut session = self
			.sessions
			.get(&sender.user_id)
			.await?
			.filter(|s| s.action == Action::Transfer && s.step == Some(Step::Destination))
			.ok_or_else(|| StepError::Lookup(messages::session_expired()))?;

		if session.source_network == Some(network) {
			return Err(StepError::User(
				"The destination must differ from the source network.".to_string(),
			));
		}

		session.destination_network = Some(network);
		session.step = Some(Step::Amount);
		self.sessions.set(&sender.user_id, &session).await?;
		Ok(messages::amount_prompt(sender.chat_id, &session))
	}

	async fn confirm(&self, sender: &Sender, action: Action) -> Result<OutboundMessage, StepError> {
		let session = self
			.sessions
			.get(&sender.user_id)
			.await?
			.filter(|s| s.action == action && s.step == Some(Step::Confirm))
			.ok_or_else(|| StepError::Lookup(messages::session_expired()))?;

		let candidate = candidate_order(&session, &sender.user_id);
		// The session is finished whatever happens next.
		self.sessions.delete(&sender.user_id).await?;

		let order = self.orders.validate(&candidate).map_err(|e| {
			error!(user_id = %sender.user_id, candidate = %candidate, error = %e, "Order failed validation");
			StepError::Upstream(format!("validation: {}", e))
		})?;
		let body = serde_json::to_value(&order)
			.map_err(|e| StepError::Upstream(format!("serialize order: {}", e)))?;
		let message_id = self
			.queue
			.send(body)
			.await
			.map_err(|e| StepError::Upstream(format!("enqueue: {}", e)))?;

		info!(user_id = %sender.user_id, action = %action, message_id = %message_id, "Order queued");
		Ok(messages::order_submitted(sender.chat_id, action))
	}

	async fn cancel(&self, sender: &Sender) -> Result<OutboundMessage, StepError> {
		self.sessions.delete(&sender.user_id).await?;
		Ok(messages::cancelled(sender.chat_id))
	}

	/// Resolves the wallet for commands that need it.
	pub async fn wallet_for(&self, sender: &Sender) -> Result<bot_types::Wallet, StepError> {
		self.accounts
			.wallet(&sender.user_id)
			.await
			.map_err(|e| match e {
				AccountError::NotFound(_) => StepError::Lookup(messages::no_wallet()),
				other => StepError::Upstream(format!("wallet lookup: {}", other)),
			})
	}

	pub fn balances(&self) -> &BalanceService {
		&self.balances
	}
}

/// Order as the queue contract expects it, before validation.
fn candidate_order(session: &UserSession, user_id: &str) -> serde_json::Value {
	let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
	match session.action {
		Action::Buy => json!({
			"type": "buy",
			"network": session.network,
			"amount": session.amount,
			"user": user_id,
			"timestamp": timestamp,
		}),
		Action::Send => json!({
			"type": "send",
			"network": session.network,
			"address": session.address,
			"amount": session.amount,
			"user": user_id,
			"timestamp": timestamp,
		}),
		Action::Transfer => json!({
			"type": "transfer",
			"sourceNetwork": session.source_network,
			"destNetwork": session.destination_network,
			"amount": session.amount,
			"user": user_id,
			"timestamp": timestamp,
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_amount_rules() {
		for valid in ["1", "0.01", "12.34", "100.5", "5.01"] {
			assert!(is_valid_amount(Action::Send, valid), "{}", valid);
		}
		for invalid in ["0", "0.00", "-1", "1.234", "abc", "", "1.", ".5", "1e3", " 1"] {
			assert!(!is_valid_amount(Action::Send, invalid), "{}", invalid);
		}

		assert!(!is_valid_amount(Action::Buy, "3"));
		assert!(!is_valid_amount(Action::Buy, "5"));
		assert!(!is_valid_amount(Action::Buy, "5.00"));
		assert!(is_valid_amount(Action::Buy, "5.01"));
		assert!(is_valid_amount(Action::Buy, "250"));
		assert!(!is_valid_amount(Action::Buy, "10.001"));
	}

	#[test]
	fn test_candidate_shape() {
		let mut session = UserSession::new(Action::Transfer);
		session.source_network = Some(Network::Base);
		session.destination_network = Some(Network::Arbitrum);
		session.amount = Some("2.50".to_string());
		session.step = Some(Step::Confirm);

		let candidate = candidate_order(&session, "42");
		assert_eq!(candidate["type"], "transfer");
		assert_eq!(candidate["sourceNetwork"], "base");
		assert_eq!(candidate["destNetwork"], "arbitrum");
		assert_eq!(candidate["user"], "42");
		assert!(candidate["timestamp"].as_str().unwrap().ends_with('Z'));
		assert!(bot_order::validate_order(&candidate).is_ok());
	}
}
