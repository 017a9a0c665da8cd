//! JSON-RPC balance reader built on an Alloy HTTP provider.

use crate::{BalanceError, BalanceInterface};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;

sol! {
	/// Read side of the ERC-20 interface.
	interface IERC20 {
		function balanceOf(address owner) external view returns (uint256);
	}
}

pub struct AlloyBalanceReader {
	provider: DynProvider,
}

impl AlloyBalanceReader {
	pub fn new(rpc_url: &str) -> Result<Self, BalanceError> {
		let url = rpc_url
			.parse()
			.map_err(|e| BalanceError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self { provider })
	}
}

#[async_trait]
impl BalanceInterface for AlloyBalanceReader {
	async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, BalanceError> {
		let calldata = IERC20::balanceOfCall { owner }.abi_encode();
		let request = TransactionRequest::default()
			.with_to(token)
			.with_input(Bytes::from(calldata));

		let output = self
			.provider
			.call(request)
			.await
			.map_err(|e| BalanceError::Rpc(e.to_string()))?;

		IERC20::balanceOfCall::abi_decode_returns(&output)
			.map_err(|e| BalanceError::Decode(e.to_string()))
	}
}

/// Factory function to create a reader for one network's RPC endpoint.
pub fn create_balance_reader(rpc_url: &str) -> Result<Box<dyn BalanceInterface>, BalanceError> {
	Ok(Box::new(AlloyBalanceReader::new(rpc_url)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_balance_of_encoding() {
		let owner: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
		let calldata = IERC20::balanceOfCall { owner }.abi_encode();

		assert_eq!(&calldata[..4], &[0x70, 0xa0, 0x82, 0x31]);
		assert_eq!(&calldata[16..36], owner.as_slice());
	}

	#[test]
	fn test_rejects_bad_url() {
		assert!(matches!(
			AlloyBalanceReader::new("not a url"),
			Err(BalanceError::Configuration(_))
		));
	}

	#[tokio::test]
	async fn test_unreachable_rpc_is_an_error() {
		let reader = AlloyBalanceReader::new("http://127.0.0.1:1").unwrap();
		let result = reader
			.balance_of(bot_types::Network::Base.usdc_address(), Address::ZERO)
			.await;
		assert!(matches!(result, Err(BalanceError::Rpc(_))));
	}
}
