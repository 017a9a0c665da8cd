//! Send orders: a plain ERC-20 `transfer` of USDC on one chain.

use crate::{usdc_units, OrderError, OrderInterface};
use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use bot_types::{
	is_hex_address, Action, ConfigSchema, Order, Schema, Transaction, ValidationErrors, Wallet,
};

sol! {
	/// Write side of the ERC-20 interface.
	interface IERC20 {
		function transfer(address to, uint256 amount) external returns (bool);
		function approve(address spender, uint256 amount) external returns (bool);
	}
}

pub struct Erc20Transfer;

/// Configuration schema for Erc20Transfer. Takes no settings.
pub struct Erc20TransferSchema;

impl ConfigSchema for Erc20TransferSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		Schema::new(vec![], vec![]).validate_toml(config)
	}
}

impl OrderInterface for Erc20Transfer {
	fn build_transactions(
		&self,
		order: &Order,
		wallet: &Wallet,
	) -> Result<Vec<Transaction>, OrderError> {
		let Order::Send(send) = order else {
			return Err(OrderError::TypeMismatch {
				expected: Action::Send,
				actual: order.action(),
			});
		};

		if !is_hex_address(&send.address) {
			return Err(OrderError::InvalidAddress(send.address.clone()));
		}
		let to: Address = send
			.address
			.parse()
			.map_err(|_| OrderError::InvalidAddress(send.address.clone()))?;
		let amount = usdc_units(&send.amount)?;

		tracing::debug!(
			network = %send.network,
			from = %wallet.address,
			to = %to,
			amount = %send.amount,
			"Encoding USDC transfer"
		);

		Ok(vec![Transaction {
			to: send.network.usdc_address(),
			data: IERC20::transferCall { to, amount }.abi_encode(),
			value: U256::ZERO,
			chain_id: send.network.chain_id(),
			label: "transfer".to_string(),
		}])
	}
}

/// Encodes `approve(spender, amount)` on the USDC contract of a chain.
pub fn approve_call(spender: Address, amount: U256) -> Vec<u8> {
	IERC20::approveCall { spender, amount }.abi_encode()
}

/// Factory function to create the send order implementation.
pub fn create_order_impl(config: &toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> {
	Erc20TransferSchema
		.validate(config)
		.map_err(|e| OrderError::Configuration(e.to_string()))?;
	Ok(Box::new(Erc20Transfer))
}
