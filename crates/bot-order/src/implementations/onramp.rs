//! Buy orders: the purchase itself happens in the Coinbase Onramp flow
//! opened by the user, so no call is built for the custodial wallet.

use crate::{OrderError, OrderInterface};
use bot_types::{Action, ConfigSchema, Order, Schema, Transaction, ValidationErrors, Wallet};

pub struct OnrampPurchase;

pub struct OnrampPurchaseSchema;

impl ConfigSchema for OnrampPurchaseSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		Schema::new(vec![], vec![]).validate_toml(config)
	}
}

impl OrderInterface for OnrampPurchase {
	fn build_transactions(
		&self,
		order: &Order,
		_wallet: &Wallet,
	) -> Result<Vec<Transaction>, OrderError> {
		match order {
			Order::Buy(_) => Ok(Vec::new()),
			other => Err(OrderError::TypeMismatch {
				expected: Action::Buy,
				actual: other.action(),
			}),
		}
	}
}

/// Factory function to create the buy order implementation.
pub fn create_order_impl(config: &toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> {
	OnrampPurchaseSchema
		.validate(config)
		.map_err(|e| OrderError::Configuration(e.to_string()))?;
	Ok(Box::new(OnrampPurchase))
}

#[cfg(test)]
mod tests {
	use super::*;
	use bot_types::{BuyOrder, Network};

	#[test]
	fn test_buy_builds_nothing() {
		let order = Order::Buy(BuyOrder {
			network: Network::Ethereum,
			amount: "25".to_string(),
			user: "42".to_string(),
			timestamp: "2025-01-01T00:00:00Z".to_string(),
		});
		let wallet = Wallet {
			id: "w".to_string(),
			address: alloy::primitives::Address::ZERO,
		};
		assert!(OnrampPurchase
			.build_transactions(&order, &wallet)
			.unwrap()
			.is_empty());
	}
}
