//! Order validation and transaction building.
//!
//! Confirmed conversations produce candidate orders that are validated
//! against per-type schemas before they reach the queue. On the consuming
//! side each order type has an implementation that turns the order into the
//! unsigned calls the user's custodial wallet has to make.

use alloy::primitives::{utils::parse_units, U256};
use bot_types::{Action, Order, Transaction, ValidationErrors, Wallet, USDC_DECIMALS};
use std::collections::HashMap;
use thiserror::Error;

pub mod validator;

pub use validator::validate_order;

/// Re-export implementations
pub mod implementations {
	pub mod cctp;
	pub mod erc20;
	pub mod onramp;
}

/// Errors that can occur during order processing operations.
#[derive(Debug, Error)]
pub enum OrderError {
	/// The candidate order does not satisfy its schema.
	#[error("Validation failed: {0}")]
	Validation(ValidationErrors),
	/// No implementation is registered for the order type.
	#[error("Unsupported order type: {0}")]
	Unsupported(Action),
	/// The order was handed to an implementation for a different type.
	#[error("Order type mismatch: expected {expected}, got {actual}")]
	TypeMismatch { expected: Action, actual: Action },
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Converts a decimal USDC amount to base units, rejecting zero.
pub fn usdc_units(amount: &str) -> Result<U256, OrderError> {
	let units = parse_units(amount, USDC_DECIMALS)
		.map_err(|e| OrderError::InvalidAmount(format!("{}: {}", amount, e)))?
		.get_absolute();
	if units.is_zero() {
		return Err(OrderError::InvalidAmount(format!("{} is zero", amount)));
	}
	Ok(units)
}

/// Builds the calls that execute one order type.
pub trait OrderInterface: Send + Sync {
	/// Unsigned calls to be made by `wallet`, in execution order.
	///
	/// An empty list means the order needs no on-chain action from the bot.
	fn build_transactions(
		&self,
		order: &Order,
		wallet: &Wallet,
	) -> Result<Vec<Transaction>, OrderError>;
}

pub struct OrderService {
	implementations: HashMap<Action, Box<dyn OrderInterface>>,
}

impl OrderService {
	pub fn new(implementations: HashMap<Action, Box<dyn OrderInterface>>) -> Self {
		Self { implementations }
	}

	/// Validates a candidate queue message.
	pub fn validate(&self, candidate: &serde_json::Value) -> Result<Order, OrderError> {
		validate_order(candidate)
	}

	pub fn build_transactions(
		&self,
		order: &Order,
		wallet: &Wallet,
	) -> Result<Vec<Transaction>, OrderError> {
		self.implementations
			.get(&order.action())
			.ok_or(OrderError::Unsupported(order.action()))?
			.build_transactions(order, wallet)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bot_types::{BuyOrder, Network};

	#[test]
	fn test_usdc_units() {
		assert_eq!(usdc_units("12.34").unwrap(), U256::from(12_340_000u64));
		assert_eq!(usdc_units("5").unwrap(), U256::from(5_000_000u64));
		assert_eq!(usdc_units("0.01").unwrap(), U256::from(10_000u64));
		assert!(matches!(usdc_units("0"), Err(OrderError::InvalidAmount(_))));
		assert!(matches!(usdc_units("0.00"), Err(OrderError::InvalidAmount(_))));
		assert!(matches!(usdc_units("abc"), Err(OrderError::InvalidAmount(_))));
	}

	#[test]
	fn test_service_without_implementation() {
		let service = OrderService::new(HashMap::new());
		let order = Order::Buy(BuyOrder {
			network: Network::Base,
			amount: "10".to_string(),
			user: "1".to_string(),
			timestamp: "2025-01-01T00:00:00Z".to_string(),
		});
		let wallet = Wallet {
			id: "w".to_string(),
			address: alloy::primitives::Address::ZERO,
		};

		assert!(matches!(
			service.build_transactions(&order, &wallet),
			Err(OrderError::Unsupported(Action::Buy))
		));
	}
}
