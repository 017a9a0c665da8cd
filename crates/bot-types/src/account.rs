//! Custodial wallet types.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Embedded wallet held by the auth provider on behalf of a Telegram user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
	/// Provider-side wallet identifier used for signing requests.
	pub id: String,
	/// On-chain address of the wallet.
	pub address: Address,
}
