//! Supported networks and the per-chain USDC constants.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimals of the USDC token on every supported chain.
pub const USDC_DECIMALS: u8 = 6;

/// Error returned when a network name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown network: {0}")]
pub struct UnknownNetwork(pub String);

/// EVM networks the bot holds USDC on.
///
/// Declaration order is the display order used for keyboards and balance
/// listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Ethereum,
	Base,
	Arbitrum,
	Avalanche,
}

impl Network {
	/// Every supported network, in display order.
	pub const ALL: [Network; 4] = [
		Network::Ethereum,
		Network::Base,
		Network::Arbitrum,
		Network::Avalanche,
	];

	/// Lowercase identifier used in orders, callbacks and configuration.
	pub fn as_str(&self) -> &'static str {
		match self {
			Network::Ethereum => "ethereum",
			Network::Base => "base",
			Network::Arbitrum => "arbitrum",
			Network::Avalanche => "avalanche",
		}
	}

	/// Human readable name for chat messages.
	pub fn display_name(&self) -> &'static str {
		match self {
			Network::Ethereum => "Ethereum",
			Network::Base => "Base",
			Network::Arbitrum => "Arbitrum",
			Network::Avalanche => "Avalanche",
		}
	}

	/// EIP-155 chain id.
	pub fn chain_id(&self) -> u64 {
		match self {
			Network::Ethereum => 1,
			Network::Base => 8453,
			Network::Arbitrum => 42161,
			Network::Avalanche => 43114,
		}
	}

	/// Native USDC contract on this chain.
	pub fn usdc_address(&self) -> Address {
		match self {
			Network::Ethereum => address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
			Network::Base => address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
			Network::Arbitrum => address!("af88d065e77c8cc2239327c5edb3a432268e5831"),
			Network::Avalanche => address!("b97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
		}
	}

	/// Circle CCTP domain identifier.
	pub fn cctp_domain(&self) -> u32 {
		match self {
			Network::Ethereum => 0,
			Network::Avalanche => 1,
			Network::Arbitrum => 3,
			Network::Base => 6,
		}
	}

	/// CAIP-2 identifier, e.g. `eip155:8453`.
	pub fn caip2(&self) -> String {
		format!("eip155:{}", self.chain_id())
	}

	pub fn from_chain_id(chain_id: u64) -> Option<Network> {
		Self::ALL.into_iter().find(|n| n.chain_id() == chain_id)
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Network {
	type Err = UnknownNetwork;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|n| n.as_str() == s)
			.ok_or_else(|| UnknownNetwork(s.to_string()))
	}
}

/// The three user-facing flows of the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
	Buy,
	Send,
	Transfer,
}

impl Action {
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Buy => "buy",
			Action::Send => "send",
			Action::Transfer => "transfer",
		}
	}

	/// Networks a user may pick as the first step of this flow.
	///
	/// Onramp purchases are only offered on Ethereum and Base.
	pub fn allowed_networks(&self) -> &'static [Network] {
		match self {
			Action::Buy => &[Network::Ethereum, Network::Base],
			Action::Send | Action::Transfer => &Network::ALL,
		}
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"buy" => Ok(Action::Buy),
			"send" => Ok(Action::Send),
			"transfer" => Ok(Action::Transfer),
			other => Err(format!("Unknown action: {}", other)),
		}
	}
}
