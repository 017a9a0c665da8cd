//! Transfer orders: burn USDC on the source chain through CCTP v2.
//!
//! The user's wallet first approves the TokenMessengerV2 contract for the
//! amount, then calls `depositForBurn` targeting the destination domain with
//! the same wallet as mint recipient. Minting on the destination chain
//! happens once Circle's attestation is available and is not driven here.

use crate::implementations::erc20::approve_call;
use crate::{usdc_units, OrderError, OrderInterface};
use alloy::primitives::{address, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use bot_types::{
	Action, ConfigSchema, Field, FieldType, Order, Schema, Transaction, ValidationErrors, Wallet,
};

/// TokenMessengerV2, deployed at the same address on every supported chain.
pub const TOKEN_MESSENGER_V2: Address = address!("28b5a0e9C621a5BadaA536219b3a228C8168cf5d");

/// Finality threshold for standard (non fast) transfers.
pub const STANDARD_FINALITY_THRESHOLD: u32 = 2000;

sol! {
	interface ITokenMessengerV2 {
		function depositForBurn(
			uint256 amount,
			uint32 destinationDomain,
			bytes32 mintRecipient,
			address burnToken,
			bytes32 destinationCaller,
			uint256 maxFee,
			uint32 minFinalityThreshold
		) external;
	}
}

pub struct CctpTransfer {
	token_messenger: Address,
	max_fee: U256,
	min_finality_threshold: u32,
}

impl CctpTransfer {
	pub fn new(token_messenger: Address, max_fee: U256, min_finality_threshold: u32) -> Self {
		Self {
			token_messenger,
			max_fee,
			min_finality_threshold,
		}
	}
}

impl Default for CctpTransfer {
	fn default() -> Self {
		Self::new(TOKEN_MESSENGER_V2, U256::ZERO, STANDARD_FINALITY_THRESHOLD)
	}
}

/// Configuration schema for CctpTransfer.
pub struct CctpTransferSchema;

impl ConfigSchema for CctpTransferSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("token_messenger", FieldType::String).with_validator(|value| {
					value
						.as_str()
						.and_then(|s| s.parse::<Address>().ok())
						.map(|_| ())
						.ok_or_else(|| "token_messenger must be a 0x address".to_string())
				}),
				Field::new(
					"max_fee",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new(
					"min_finality_threshold",
					FieldType::Integer {
						min: Some(1),
						max: Some(u32::MAX as i64),
					},
				),
			],
		);
		schema.validate_toml(config)
	}
}

impl OrderInterface for CctpTransfer {
	fn build_transactions(
		&self,
		order: &Order,
		wallet: &Wallet,
	) -> Result<Vec<Transaction>, OrderError> {
		let Order::Transfer(transfer) = order else {
			return Err(OrderError::TypeMismatch {
				expected: Action::Transfer,
				actual: order.action(),
			});
		};

		let source = transfer.source_network;
		let destination = transfer.dest_network;
		if source == destination {
			return Err(OrderError::Validation(ValidationErrors::single(
				bot_types::ValidationError::InvalidValue {
					field: "destNetwork".to_string(),
					message: "must differ from sourceNetwork".to_string(),
				},
			)));
		}

		let amount = usdc_units(&transfer.amount)?;
		let burn = ITokenMessengerV2::depositForBurnCall {
			amount,
			destinationDomain: destination.cctp_domain(),
			mintRecipient: wallet.address.into_word(),
			burnToken: source.usdc_address(),
			destinationCaller: B256::ZERO,
			maxFee: self.max_fee,
			minFinalityThreshold: self.min_finality_threshold,
		};

		tracing::debug!(
			source = %source,
			destination = %destination,
			domain = destination.cctp_domain(),
			recipient = %wallet.address,
			amount = %transfer.amount,
			"Encoding CCTP burn"
		);

		Ok(vec![
			Transaction {
				to: source.usdc_address(),
				data: approve_call(self.token_messenger, amount),
				value: U256::ZERO,
				chain_id: source.chain_id(),
				label: "approve".to_string(),
			},
			Transaction {
				to: self.token_messenger,
				data: burn.abi_encode(),
				value: U256::ZERO,
				chain_id: source.chain_id(),
				label: "depositForBurn".to_string(),
			},
		])
	}
}

/// Factory function to create the transfer order implementation.
///
/// Configuration parameters:
/// - `token_messenger`: TokenMessengerV2 address override
/// - `max_fee`: fee cap in USDC base units (default 0)
/// - `min_finality_threshold`: 1000 for fast, 2000 for standard (default)
pub fn create_order_impl(config: &toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> {
	CctpTransferSchema
		.validate(config)
		.map_err(|e| OrderError::Configuration(e.to_string()))?;

	let token_messenger = match config.get("token_messenger").and_then(|v| v.as_str()) {
		Some(s) => s
			.parse()
			.map_err(|e| OrderError::Configuration(format!("token_messenger: {}", e)))?,
		None => TOKEN_MESSENGER_V2,
	};
	let max_fee = config
		.get("max_fee")
		.and_then(|v| v.as_integer())
		.map(|fee| U256::from(fee as u64))
		.unwrap_or(U256::ZERO);
	let min_finality_threshold = config
		.get("min_finality_threshold")
		.and_then(|v| v.as_integer())
		.map(|t| t as u32)
		.unwrap_or(STANDARD_FINALITY_THRESHOLD);

	Ok(Box::new(CctpTransfer::new(
		token_messenger,
		max_fee,
		min_finality_threshold,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::erc20::IERC20;
	use bot_types::{Network, TransferOrder};

	fn wallet() -> Wallet {
		Wallet {
			id: "w-1".to_string(),
			address: "0x4242424242424242424242424242424242424242".parse().unwrap(),
		}
	}

	fn transfer(source: Network, dest: Network) -> Order {
		Order::Transfer(TransferOrder {
			source_network: source,
			dest_network: dest,
			amount: "2.5".to_string(),
			user: "42".to_string(),
			timestamp: "2025-01-01T00:00:00Z".to_string(),
		})
	}

	#[test]
	fn test_burn_targets_destination_domain_and_own_wallet() {
		let txs = CctpTransfer::default()
			.build_transactions(&transfer(Network::Base, Network::Arbitrum), &wallet())
			.unwrap();

		assert_eq!(txs.len(), 2);
		assert!(txs.iter().all(|tx| tx.chain_id == 8453));

		let approve = IERC20::approveCall::abi_decode(&txs[0].data).unwrap();
		assert_eq!(txs[0].to, Network::Base.usdc_address());
		assert_eq!(approve.spender, TOKEN_MESSENGER_V2);
		assert_eq!(approve.amount, U256::from(2_500_000u64));

		assert_eq!(txs[1].to, TOKEN_MESSENGER_V2);
		let burn = ITokenMessengerV2::depositForBurnCall::abi_decode(&txs[1].data).unwrap();
		assert_eq!(burn.amount, U256::from(2_500_000u64));
		assert_eq!(burn.destinationDomain, 3);
		assert_eq!(burn.burnToken, Network::Base.usdc_address());
		assert_eq!(burn.destinationCaller, B256::ZERO);
		assert_eq!(burn.maxFee, U256::ZERO);
		assert_eq!(burn.minFinalityThreshold, 2000);

		let recipient = burn.mintRecipient;
		assert_eq!(&recipient[..12], &[0u8; 12]);
		assert_eq!(&recipient[12..], wallet().address.as_slice());
	}

	#[test]
	fn test_same_network_is_rejected() {
		assert!(matches!(
			CctpTransfer::default()
				.build_transactions(&transfer(Network::Base, Network::Base), &wallet()),
			Err(OrderError::Validation(_))
		));
	}

	#[test]
	fn test_factory_overrides() {
		let config: toml::Value = toml::from_str(
			r#"
token_messenger = "0x1111111111111111111111111111111111111111"
max_fee = 500
min_finality_threshold = 1000
"#,
		)
		.unwrap();
		let implementation = create_order_impl(&config).unwrap();
		let txs = implementation
			.build_transactions(&transfer(Network::Ethereum, Network::Avalanche), &wallet())
			.unwrap();

		let burn = ITokenMessengerV2::depositForBurnCall::abi_decode(&txs[1].data).unwrap();
		assert_eq!(
			txs[1].to,
			"0x1111111111111111111111111111111111111111".parse::<Address>().unwrap()
		);
		assert_eq!(burn.destinationDomain, 1);
		assert_eq!(burn.maxFee, U256::from(500u64));
		assert_eq!(burn.minFinalityThreshold, 1000);

		let bad: toml::Value = toml::from_str("token_messenger = \"nope\"").unwrap();
		assert!(matches!(
			create_order_impl(&bad),
			Err(OrderError::Configuration(_))
		));
	}
}
