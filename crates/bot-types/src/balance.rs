//! Formatted USDC balances per network.

use crate::Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display value used for a chain that could not be read.
pub const ZERO_BALANCE: &str = "$0.00";

/// Mapping of every supported network to a `"$x.yy"` string.
///
/// Always holds an entry for each network in [`Network::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalances(BTreeMap<Network, String>);

impl TokenBalances {
	/// All networks at `"$0.00"`.
	pub fn zeroed() -> Self {
		Self(
			Network::ALL
				.into_iter()
				.map(|n| (n, ZERO_BALANCE.to_string()))
				.collect(),
		)
	}

	pub fn set(&mut self, network: Network, formatted: String) {
		self.0.insert(network, formatted);
	}

	pub fn get(&self, network: Network) -> &str {
		self.0.get(&network).map(String::as_str).unwrap_or(ZERO_BALANCE)
	}

	pub fn iter(&self) -> impl Iterator<Item = (Network, &str)> {
		self.0.iter().map(|(n, v)| (*n, v.as_str()))
	}
}

impl Default for TokenBalances {
	fn default() -> Self {
		Self::zeroed()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_zeroed_covers_all_networks() {
		let balances = TokenBalances::zeroed();
		assert_eq!(balances.iter().count(), 4);
		assert!(balances.iter().all(|(_, v)| v == ZERO_BALANCE));
	}
}
