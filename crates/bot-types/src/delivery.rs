//! Transaction types produced by order processing.
//!
//! A transaction here is unsigned call data: the bot never holds keys, the
//! custodial wallet provider signs on submission.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unsigned EVM call built from an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Contract the call targets.
	pub to: Address,
	/// ABI encoded call data.
	pub data: Vec<u8>,
	/// Native value attached to the call.
	pub value: U256,
	/// Chain the call is meant for.
	pub chain_id: u64,
	/// Short label for chat output, e.g. `approve` or `depositForBurn`.
	pub label: String,
}

impl Transaction {
	/// Call data as a `0x` prefixed hex string.
	pub fn data_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.data))
	}
}

/// Blockchain transaction hash representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hex_rendering() {
		let tx = Transaction {
			to: Address::ZERO,
			data: vec![0xa9, 0x05, 0x9c, 0xbb],
			value: U256::ZERO,
			chain_id: 1,
			label: "transfer".to_string(),
		};
		assert_eq!(tx.data_hex(), "0xa9059cbb");
		assert_eq!(TransactionHash(vec![0xde, 0xad]).to_string(), "0xdead");
	}
}
