//! Typed payloads carried through inline keyboard buttons.
//!
//! Telegram limits `callback_data` to 64 bytes, so each variant is encoded
//! as a short colon separated record. Network and action identifiers never
//! contain a colon and every variant has a fixed field count.

use crate::{Action, Network};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum size of Telegram `callback_data`.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed callback data: {0}")]
pub struct CallbackParseError(pub String);

/// What the user asked for by pressing a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
	/// First network choice of a flow.
	SelectNetwork { action: Action, network: Network },
	/// Destination network of a transfer.
	SelectDestination { network: Network },
	/// Submit the order built by the flow.
	Confirm { action: Action },
	/// Abandon the current flow.
	Cancel,
}

impl fmt::Display for CallbackAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CallbackAction::SelectNetwork { action, network } => {
				write!(f, "net:{}:{}", action, network)
			}
			CallbackAction::SelectDestination { network } => write!(f, "dst:{}", network),
			CallbackAction::Confirm { action } => write!(f, "ok:{}", action),
			CallbackAction::Cancel => f.write_str("cancel"),
		}
	}
}

impl FromStr for CallbackAction {
	type Err = CallbackParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let malformed = || CallbackParseError(s.to_string());
		let parts: Vec<&str> = s.split(':').collect();

		match parts.as_slice() {
			["net", action, network] => Ok(CallbackAction::SelectNetwork {
				action: action.parse().map_err(|_| malformed())?,
				network: network.parse().map_err(|_| malformed())?,
			}),
			["dst", network] => Ok(CallbackAction::SelectDestination {
				network: network.parse().map_err(|_| malformed())?,
			}),
			["ok", action] => Ok(CallbackAction::Confirm {
				action: action.parse().map_err(|_| malformed())?,
			}),
			["cancel"] => Ok(CallbackAction::Cancel),
			_ => Err(malformed()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_every_payload_fits_telegram_limit() {
		let mut payloads = vec![CallbackAction::Cancel];
		for network in Network::ALL {
			payloads.push(CallbackAction::SelectDestination { network });
			for action in [Action::Buy, Action::Send, Action::Transfer] {
				payloads.push(CallbackAction::SelectNetwork { action, network });
				payloads.push(CallbackAction::Confirm { action });
			}
		}

		for payload in payloads {
			let encoded = payload.to_string();
			assert!(encoded.len() <= MAX_CALLBACK_DATA_LEN);
			assert_eq!(encoded.parse::<CallbackAction>(), Ok(payload));
		}
	}

	#[test]
	fn test_rejects_malformed_payloads() {
		for bad in [
			"",
			"net:send",
			"net:send:base:extra",
			"net:swap:base",
			"dst:solana",
			"ok",
			"send_confirm_base_12.34",
			"cancel:now",
		] {
			assert!(bad.parse::<CallbackAction>().is_err(), "{bad}");
		}
	}
}
