//! Orders produced by a confirmed conversation and consumed from the queue.
//!
//! The JSON form is the queue message contract: an object tagged by `type`
//! with camelCase field names.

use crate::{Action, Network};
use serde::{Deserialize, Serialize};

/// A validated user intent ready for queued processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Order {
	Buy(BuyOrder),
	Send(SendOrder),
	Transfer(TransferOrder),
}

/// Purchase of USDC through the onramp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyOrder {
	pub network: Network,
	pub amount: String,
	pub user: String,
	pub timestamp: String,
}

/// ERC-20 transfer of USDC to an external address on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOrder {
	pub network: Network,
	pub address: String,
	pub amount: String,
	pub user: String,
	pub timestamp: String,
}

/// Cross-chain move of the user's own USDC through CCTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOrder {
	pub source_network: Network,
	pub dest_network: Network,
	pub amount: String,
	pub user: String,
	pub timestamp: String,
}

impl Order {
	pub fn action(&self) -> Action {
		match self {
			Order::Buy(_) => Action::Buy,
			Order::Send(_) => Action::Send,
			Order::Transfer(_) => Action::Transfer,
		}
	}

	/// Telegram user id of the order owner.
	pub fn user(&self) -> &str {
		match self {
			Order::Buy(o) => &o.user,
			Order::Send(o) => &o.user,
			Order::Transfer(o) => &o.user,
		}
	}

	pub fn amount(&self) -> &str {
		match self {
			Order::Buy(o) => &o.amount,
			Order::Send(o) => &o.amount,
			Order::Transfer(o) => &o.amount,
		}
	}

	/// Network the funds leave from.
	pub fn network(&self) -> Network {
		match self {
			Order::Buy(o) => o.network,
			Order::Send(o) => o.network,
			Order::Transfer(o) => o.source_network,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_transfer_order_wire_format() {
		let order = Order::Transfer(TransferOrder {
			source_network: Network::Base,
			dest_network: Network::Arbitrum,
			amount: "1.50".to_string(),
			user: "42".to_string(),
			timestamp: "2025-01-01T00:00:00.000Z".to_string(),
		});

		assert_eq!(
			serde_json::to_value(&order).unwrap(),
			json!({
				"type": "transfer",
				"sourceNetwork": "base",
				"destNetwork": "arbitrum",
				"amount": "1.50",
				"user": "42",
				"timestamp": "2025-01-01T00:00:00.000Z"
			})
		);
		assert_eq!(order.action(), Action::Transfer);
		assert_eq!(order.network(), Network::Base);
	}

	#[test]
	fn test_unknown_fields_are_dropped() {
		let order: Order = serde_json::from_value(json!({
			"type": "buy",
			"network": "ethereum",
			"amount": "10",
			"user": "7",
			"timestamp": "2025-01-01T00:00:00Z",
			"extra": "ignored"
		}))
		.unwrap();

		let value = serde_json::to_value(&order).unwrap();
		assert!(value.get("extra").is_none());
		assert_eq!(order.user(), "7");
	}
}
