//! Per-user conversation state.

use crate::{Action, Network};
use serde::{Deserialize, Serialize};

/// Input the next message or callback of a flow is interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
	/// Waiting for a destination network button (transfer).
	Destination,
	/// Waiting for a recipient address as free text (send).
	Address,
	/// Waiting for an amount as free text.
	Amount,
	/// Waiting for the confirm or cancel button.
	Confirm,
}

impl Step {
	/// Whether a free-text message is meaningful at this step.
	pub fn accepts_text(&self) -> bool {
		matches!(self, Step::Address | Step::Amount)
	}
}

/// Accumulated state of one in-progress flow, keyed by Telegram user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
	pub action: Action,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub network: Option<Network>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_network: Option<Network>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub destination_network: Option<Network>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub step: Option<Step>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<String>,
}

impl UserSession {
	pub fn new(action: Action) -> Self {
		Self {
			action,
			network: None,
			source_network: None,
			destination_network: None,
			step: None,
			address: None,
			amount: None,
		}
	}
}
