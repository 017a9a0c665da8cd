//! Submission of built transactions through the custodial wallet provider.

use alloy::primitives::keccak256;
use async_trait::async_trait;
use bot_types::{Transaction, TransactionHash, Wallet};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod privy;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	/// The provider refused the transaction.
	#[error("Rejected by provider: {0}")]
	Rejected(String),
	#[error("Invalid provider response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Asks the provider to sign and broadcast `tx` from `wallet`.
	///
	/// Submitting twice with the same `idempotency_key` must not broadcast twice.
	async fn submit(
		&self,
		wallet: &Wallet,
		tx: &Transaction,
		idempotency_key: &str,
	) -> Result<TransactionHash, DeliveryError>;
}

/// Key identifying the `index`-th transaction of a queued order.
///
/// Derived from the message body so a redelivered order maps to the same keys.
pub fn idempotency_key(order_body: &[u8], index: usize) -> String {
	let mut preimage = order_body.to_vec();
	preimage.extend_from_slice(&(index as u64).to_be_bytes());
	hex::encode(keccak256(&preimage))
}

pub struct DeliveryService {
	provider: Box<dyn DeliveryInterface>,
}

impl DeliveryService {
	pub fn new(provider: Box<dyn DeliveryInterface>) -> Self {
		Self { provider }
	}

	/// Submits the transactions of one order in order, stopping at the first failure.
	pub async fn deliver_all(
		&self,
		wallet: &Wallet,
		txs: &[Transaction],
		order_body: &[u8],
	) -> Result<Vec<TransactionHash>, DeliveryError> {
		let mut hashes = Vec::with_capacity(txs.len());
		for (index, tx) in txs.iter().enumerate() {
			let key = idempotency_key(order_body, index);
			let hash = self.provider.submit(wallet, tx, &key).await?;
			tracing::info!(
				wallet = %wallet.address,
				chain_id = tx.chain_id,
				label = %tx.label,
				tx_hash = %hash,
				"Submitted transaction"
			);
			hashes.push(hash);
		}
		Ok(hashes)
	}
}
