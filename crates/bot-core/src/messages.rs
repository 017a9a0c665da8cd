//! Chat texts and inline keyboards.
//!
//! Severity prefixes: ❌ user error, ⚠️ service problem, ✅ success,
//! 🚫 cancelled.

use bot_types::{
	Action, CallbackAction, InlineKeyboardButton, InlineKeyboardMarkup, Network, OutboundMessage,
	TokenBalances, Transaction, TransactionHash, UserSession,
};

const HELP: &str = "Available commands:\n\
	/account - Show your wallet address and USDC balances\n\
	/send - Send USDC to an address\n\
	/transfer - Move USDC to another network\n\
	/buy - Buy USDC with card or bank\n\
	/help - Show this message";

pub const SERVICE_ERROR: &str =
	"⚠️ Something went wrong while processing your request. Please try again later.";

fn title(action: Action) -> &'static str {
	match action {
		Action::Buy => "Buy",
		Action::Send => "Send",
		Action::Transfer => "Transfer",
	}
}

fn cancel_row() -> Vec<InlineKeyboardButton> {
	vec![InlineKeyboardButton::callback(
		"❌ Cancel",
		CallbackAction::Cancel,
	)]
}

/// Two network buttons per row, then a cancel row.
fn network_keyboard(
	networks: impl IntoIterator<Item = Network>,
	callback: impl Fn(Network) -> CallbackAction,
) -> InlineKeyboardMarkup {
	let buttons: Vec<InlineKeyboardButton> = networks
		.into_iter()
		.map(|network| InlineKeyboardButton::callback(network.display_name(), callback(network)))
		.collect();

	let mut rows: Vec<Vec<InlineKeyboardButton>> =
		buttons.chunks(2).map(|row| row.to_vec()).collect();
	rows.push(cancel_row());
	InlineKeyboardMarkup::new(rows)
}

fn balance_line(balance: Option<&str>) -> String {
	balance
		.map(|b| format!("\nBalance: {}", b))
		.unwrap_or_default()
}

pub fn welcome(chat_id: i64, webapp_url: Option<&str>) -> OutboundMessage {
	let text = format!(
		"👋 Welcome to your USDC wallet!\n\n\
		Hold, send and move USDC across Ethereum, Base, Arbitrum and Avalanche.\n\n{}",
		HELP
	);
	let message = OutboundMessage::text(chat_id, text);
	match webapp_url {
		Some(url) => message.with_keyboard(InlineKeyboardMarkup::new(vec![vec![
			InlineKeyboardButton::web_app("💳 Open Wallet", url),
		]])),
		None => message,
	}
}

pub fn help(chat_id: i64) -> OutboundMessage {
	OutboundMessage::text(chat_id, HELP)
}

pub fn unknown_command(chat_id: i64, command: &str) -> OutboundMessage {
	OutboundMessage::text(
		chat_id,
		format!("❓ Unknown command: {}\n\n{}", command, HELP),
	)
}

pub fn fallback(chat_id: i64) -> OutboundMessage {
	OutboundMessage::text(
		chat_id,
		format!("❓ I didn't understand that. Pick a command to get started.\n\n{}", HELP),
	)
}

pub fn account_summary(chat_id: i64, address: &str, balances: &TokenBalances) -> OutboundMessage {
	let lines: Vec<String> = balances
		.iter()
		.map(|(network, balance)| format!("• {}: {}", network.display_name(), balance))
		.collect();
	OutboundMessage::text(
		chat_id,
		format!(
			"💰 Your Wallet\n\nAddress: {}\n\nUSDC balances:\n{}",
			address,
			lines.join("\n")
		),
	)
}

/// First step of every flow.
pub fn choose_network(chat_id: i64, action: Action) -> OutboundMessage {
	let prompt = match action {
		Action::Buy => "Select the network to buy USDC on:",
		Action::Send => "Select the network to send USDC from:",
		Action::Transfer => "Select the source network for your transfer:",
	};
	OutboundMessage::text(chat_id, prompt).with_keyboard(network_keyboard(
		action.allowed_networks().iter().copied(),
		|network| CallbackAction::SelectNetwork { action, network },
	))
}

pub fn address_prompt(chat_id: i64, network: Network, balance: Option<&str>) -> OutboundMessage {
	OutboundMessage::text(
		chat_id,
		format!(
			"Network: {}{}\n\nEnter the recipient address (0x...):",
			network.display_name(),
			balance_line(balance)
		),
	)
	.with_keyboard(InlineKeyboardMarkup::new(vec![cancel_row()]))
}

/// Destination choices of a transfer, never including the source.
pub fn destination_prompt(chat_id: i64, source: Network, balance: Option<&str>) -> OutboundMessage {
	OutboundMessage::text(
		chat_id,
		format!(
			"Source network: {}{}\n\nSelect the destination network:",
			source.display_name(),
			balance_line(balance)
		),
	)
	.with_keyboard(network_keyboard(
		Network::ALL.into_iter().filter(|n| *n != source),
		|network| CallbackAction::SelectDestination { network },
	))
}

pub fn amount_prompt(chat_id: i64, session: &UserSession) -> OutboundMessage {
	let context = match session.action {
		Action::Buy => format!(
			"Network: {}\n\nEnter the amount of USDC to buy (more than $5):",
			session.network.map(|n| n.display_name()).unwrap_or_default()
		),
		Action::Send => format!(
			"Recipient: {}\n\nEnter the amount of USDC to send:",
			session.address.as_deref().unwrap_or_default()
		),
		Action::Transfer => format!(
			"Destination network: {}\n\nEnter the amount of USDC to transfer:",
			session
				.destination_network
				.map(|n| n.display_name())
				.unwrap_or_default()
		),
	};
	OutboundMessage::text(chat_id, context)
		.with_keyboard(InlineKeyboardMarkup::new(vec![cancel_row()]))
}

pub fn invalid_address() -> String {
	"Invalid address. Enter a valid address (0x followed by 40 hex characters):".to_string()
}

pub fn invalid_amount(action: Action) -> String {
	match action {
		Action::Buy => {
			"Invalid amount. The amount must be greater than $5 with at most 2 decimals:"
				.to_string()
		}
		_ => "Invalid amount. Enter a positive number with at most 2 decimals:".to_string(),
	}
}

pub fn use_buttons() -> String {
	"Please use the buttons above to continue, or cancel.".to_string()
}

pub fn session_expired() -> String {
	"This conversation is no longer active. Start again with /send, /transfer or /buy."
		.to_string()
}

pub fn no_wallet() -> String {
	"No wallet is linked to your Telegram account yet. Open the app with /start to create one."
		.to_string()
}

/// Order summary with the confirm and cancel buttons.
pub fn confirm_prompt(chat_id: i64, session: &UserSession) -> OutboundMessage {
	let name = |n: Option<Network>| n.map(|n| n.display_name()).unwrap_or_default();
	let amount = session.amount.as_deref().unwrap_or_default();

	let details = match session.action {
		Action::Buy => format!("• Network: {}\n• Amount: {} USDC", name(session.network), amount),
		Action::Send => format!(
			"• Network: {}\n• To: {}\n• Amount: {} USDC",
			name(session.network),
			session.address.as_deref().unwrap_or_default(),
			amount
		),
		Action::Transfer => format!(
			"• From: {}\n• To: {}\n• Amount: {} USDC",
			name(session.source_network),
			name(session.destination_network),
			amount
		),
	};

	OutboundMessage::text(
		chat_id,
		format!("Please confirm your {}:\n\n{}", session.action, details),
	)
	.with_keyboard(InlineKeyboardMarkup::new(vec![vec![
		InlineKeyboardButton::callback(
			"✅ Confirm",
			CallbackAction::Confirm {
				action: session.action,
			},
		),
		InlineKeyboardButton::callback("❌ Cancel", CallbackAction::Cancel),
	]]))
}

pub fn order_submitted(chat_id: i64, action: Action) -> OutboundMessage {
	let text = match action {
		Action::Buy => "✅ Buy order submitted! Complete the purchase in the wallet app.".to_string(),
		other => format!(
			"✅ {} order submitted! You will receive the transaction details shortly.",
			title(other)
		),
	};
	OutboundMessage::text(chat_id, text)
}

pub fn cancelled(chat_id: i64) -> OutboundMessage {
	OutboundMessage::text(chat_id, "🚫 Operation cancelled.")
}

fn status_line(hashes: &[TransactionHash], pending: &str) -> String {
	match hashes.last() {
		Some(hash) => format!("Transaction Submitted ({})", hash),
		None => pending.to_string(),
	}
}

/// Report of a processed send order.
pub fn send_report(
	chat_id: i64,
	network: Network,
	from: &str,
	to: &str,
	amount: &str,
	tx: &Transaction,
	hashes: &[TransactionHash],
) -> OutboundMessage {
	OutboundMessage::text(
		chat_id,
		format!(
			"✅ USDC Send Tx Data Generated!\n\n📋 Transaction Data: {}\n• Network: {}\n• From: {}\n• To: {}\n• Amount: {} USDC\n• Status: {}",
			tx.data_hex(),
			network.display_name(),
			from,
			to,
			amount,
			status_line(hashes, "Ready to Sign")
		),
	)
}

/// Report of a processed transfer order.
pub fn transfer_report(
	chat_id: i64,
	source: Network,
	destination: Network,
	amount: &str,
	txs: &[Transaction],
	hashes: &[TransactionHash],
) -> OutboundMessage {
	let calls: Vec<String> = txs
		.iter()
		.map(|tx| format!("📋 {}: {}", tx.label, tx.data_hex()))
		.collect();
	OutboundMessage::text(
		chat_id,
		format!(
			"✅ USDC depositForBurn Generated!\n\n{}\n• From: {}\n• To: {}\n• Amount: {} USDC\n• Status: {}",
			calls.join("\n"),
			source.display_name(),
			destination.display_name(),
			amount,
			status_line(hashes, "Queued for Processing")
		),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bot_types::MAX_CALLBACK_DATA_LEN;

	#[test]
	fn test_destination_excludes_source() {
		for source in Network::ALL {
			let message = destination_prompt(1, source, None);
			let keyboard = message.reply_markup.unwrap();
			let destinations: Vec<Network> = keyboard
				.buttons()
				.filter_map(|b| match b.action() {
					Some(CallbackAction::SelectDestination { network }) => Some(network),
					_ => None,
				})
				.collect();

			assert_eq!(destinations.len(), 3);
			assert!(!destinations.contains(&source));
		}
	}

	#[test]
	fn test_buy_offers_two_networks() {
		let keyboard = choose_network(1, Action::Buy).reply_markup.unwrap();
		let networks: Vec<Network> = keyboard
			.buttons()
			.filter_map(|b| match b.action() {
				Some(CallbackAction::SelectNetwork { network, .. }) => Some(network),
				_ => None,
			})
			.collect();
		assert_eq!(networks, vec![Network::Ethereum, Network::Base]);
	}

	#[test]
	fn test_callback_data_fits_telegram_limit() {
		let mut session = UserSession::new(Action::Transfer);
		session.amount = Some("1".to_string());
		let messages = [
			choose_network(1, Action::Transfer),
			destination_prompt(1, Network::Avalanche, Some("$1.00")),
			confirm_prompt(1, &session),
		];
		for message in messages {
			for button in message.reply_markup.unwrap().buttons() {
				let data = button.callback_data.as_deref().unwrap();
				assert!(data.len() <= MAX_CALLBACK_DATA_LEN, "{}", data);
			}
		}
	}

	#[test]
	fn test_welcome_web_app_button() {
		let message = welcome(1, Some("https://wallet.example.com"));
		let button = message.reply_markup.unwrap().inline_keyboard[0][0].clone();
		assert_eq!(button.web_app.unwrap().url, "https://wallet.example.com");
		assert!(welcome(1, None).reply_markup.is_none());
	}
}
