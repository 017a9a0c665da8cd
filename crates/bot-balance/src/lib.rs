//! USDC balance reads across the supported networks.
//!
//! One `balanceOf` read is issued per network, all concurrently. Each read
//! is isolated: an RPC error, a decode error, a timeout or a network without
//! a configured reader yields `"$0.00"` for that network only.

use alloy::primitives::{utils::format_units, Address, U256};
use async_trait::async_trait;
use bot_types::{Network, TokenBalances, USDC_DECIMALS, ZERO_BALANCE};
use futures::future::join_all;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Re-export implementations
pub mod implementations {
	pub mod alloy;
}

#[derive(Debug, Error)]
pub enum BalanceError {
	#[error("RPC error: {0}")]
	Rpc(String),
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Timed out after {0:?}")]
	Timeout(Duration),
	#[error("No reader configured for {0}")]
	NotConfigured(Network),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Reads an ERC-20 balance on one chain.
#[async_trait]
pub trait BalanceInterface: Send + Sync {
	async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, BalanceError>;
}

/// Renders a raw USDC amount as `"$x.yy"`, rounding half away from zero.
pub fn format_usd(raw: U256) -> Result<String, BalanceError> {
	let units =
		format_units(raw, USDC_DECIMALS).map_err(|e| BalanceError::Decode(e.to_string()))?;
	let value = Decimal::from_str(&units).map_err(|e| BalanceError::Decode(e.to_string()))?;
	let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
	Ok(format!("${:.2}", rounded))
}

pub struct BalanceService {
	readers: HashMap<Network, Box<dyn BalanceInterface>>,
	timeout: Duration,
}

impl BalanceService {
	pub fn new(readers: HashMap<Network, Box<dyn BalanceInterface>>, timeout: Duration) -> Self {
		Self { readers, timeout }
	}

	async fn read(&self, network: Network, owner: Address) -> Result<String, BalanceError> {
		let reader = self
			.readers
			.get(&network)
			.ok_or(BalanceError::NotConfigured(network))?;

		let raw = tokio::time::timeout(self.timeout, reader.balance_of(network.usdc_address(), owner))
			.await
			.map_err(|_| BalanceError::Timeout(self.timeout))??;

		format_usd(raw)
	}

	/// Formatted balance on one network, `"$0.00"` on any failure.
	pub async fn balance(&self, network: Network, owner: Address) -> String {
		match self.read(network, owner).await {
			Ok(formatted) => formatted,
			Err(BalanceError::NotConfigured(_)) => ZERO_BALANCE.to_string(),
			Err(e) => {
				warn!(network = %network, owner = %owner, error = %e, "Balance read failed");
				ZERO_BALANCE.to_string()
			}
		}
	}

	/// Formatted balances on every supported network.
	pub async fn balances(&self, owner: Address) -> TokenBalances {
		let reads = Network::ALL.map(|network| async move {
			(network, self.balance(network, owner).await)
		});

		let mut balances = TokenBalances::zeroed();
		for (network, formatted) in join_all(reads).await {
			balances.set(network, formatted);
		}
		balances
	}
}
