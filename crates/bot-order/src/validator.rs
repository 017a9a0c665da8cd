//! Queue message schemas.
//!
//! A candidate order is checked against the schema selected by its `type`
//! discriminant. Every violated field is reported. The typed [`Order`]
//! returned on success only carries the fields of its schema.

use crate::OrderError;
use bot_types::{
	is_decimal_amount, is_hex_address, Action, Field, FieldType, Network, Order, Schema,
	ValidationError, ValidationErrors,
};
use serde_json::Value;

fn amount_field() -> Field {
	Field::new("amount", FieldType::String).with_validator(|value| {
		if value.as_str().is_some_and(is_decimal_amount) {
			Ok(())
		} else {
			Err("Amount must be a valid decimal with up to 2 decimal places".to_string())
		}
	})
}

fn network_field(name: &str, allowed: &'static [Network], label: &'static str) -> Field {
	Field::new(name, FieldType::String).with_validator(move |value| {
		let ok = value
			.as_str()
			.and_then(|s| s.parse::<Network>().ok())
			.is_some_and(|n| allowed.contains(&n));
		if ok {
			Ok(())
		} else {
			let names: Vec<String> = allowed.iter().map(|n| format!("'{}'", n)).collect();
			Err(format!("{} must be one of: {}", label, names.join(", ")))
		}
	})
}

fn base_fields() -> Vec<Field> {
	vec![
		Field::new("user", FieldType::String).with_validator(|value| {
			match value.as_str() {
				Some(user) if !user.is_empty() => Ok(()),
				_ => Err("User ID is required".to_string()),
			}
		}),
		Field::new("timestamp", FieldType::String).with_validator(|value| {
			if value.as_str().is_some_and(is_iso_datetime) {
				Ok(())
			} else {
				Err("Timestamp must be a valid ISO datetime".to_string())
			}
		}),
	]
}

/// UTC ISO-8601 datetime with a `Z` designator, fractional seconds optional.
fn is_iso_datetime(value: &str) -> bool {
	value.ends_with('Z') && chrono::DateTime::parse_from_rfc3339(value).is_ok()
}

/// Schema of one order type.
pub fn schema_for(action: Action) -> Schema {
	let mut required = base_fields();
	match action {
		Action::Buy => {
			required.push(network_field(
				"network",
				Action::Buy.allowed_networks(),
				"Network",
			));
			required.push(amount_field());
		}
		Action::Send => {
			required.push(network_field("network", &Network::ALL, "Network"));
			required.push(Field::new("address", FieldType::String).with_validator(|value| {
				if value.as_str().is_some_and(is_hex_address) {
					Ok(())
				} else {
					Err("Address must be a valid Ethereum address".to_string())
				}
			}));
			required.push(amount_field());
		}
		Action::Transfer => {
			required.push(network_field(
				"sourceNetwork",
				&Network::ALL,
				"Source network",
			));
			required.push(network_field(
				"destNetwork",
				&Network::ALL,
				"Destination network",
			));
			required.push(amount_field());
		}
	}
	Schema::new(required, vec![])
}

/// Validates a candidate queue message and converts it to a typed order.
pub fn validate_order(candidate: &Value) -> Result<Order, OrderError> {
	let kind = match candidate.get("type") {
		None => {
			return Err(OrderError::Validation(ValidationErrors::single(
				ValidationError::MissingField("type".to_string()),
			)))
		}
		Some(kind) => kind,
	};

	let action = kind
		.as_str()
		.and_then(|s| s.parse::<Action>().ok())
		.ok_or_else(|| {
			OrderError::Validation(ValidationErrors::single(ValidationError::InvalidValue {
				field: "type".to_string(),
				message: format!("Unknown order type {}", kind),
			}))
		})?;

	schema_for(action)
		.validate(candidate)
		.map_err(OrderError::Validation)?;

	serde_json::from_value(candidate.clone()).map_err(|e| {
		OrderError::Validation(ValidationErrors::single(ValidationError::InvalidValue {
			field: "root".to_string(),
			message: e.to_string(),
		}))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use bot_types::{SendOrder, TransferOrder};
	use serde_json::json;

	const TS: &str = "2025-06-01T12:30:00.000Z";

	fn field_errors(candidate: Value) -> Vec<String> {
		match validate_order(&candidate) {
			Err(OrderError::Validation(errors)) => {
				errors.fields().into_iter().map(String::from).collect()
			}
			other => panic!("expected validation failure, got {other:?}"),
		}
	}

	#[test]
	fn test_valid_send_order() {
		let order = validate_order(&json!({
			"type": "send",
			"network": "base",
			"address": "0x1111111111111111111111111111111111111111",
			"amount": "12.34",
			"user": "42",
			"timestamp": TS
		}))
		.unwrap();

		assert_eq!(
			order,
			Order::Send(SendOrder {
				network: Network::Base,
				address: "0x1111111111111111111111111111111111111111".to_string(),
				amount: "12.34".to_string(),
				user: "42".to_string(),
				timestamp: TS.to_string(),
			})
		);
	}

	#[test]
	fn test_extra_fields_do_not_leak() {
		let order = validate_order(&json!({
			"type": "transfer",
			"sourceNetwork": "ethereum",
			"destNetwork": "avalanche",
			"amount": "3",
			"user": "42",
			"timestamp": TS,
			"step": "confirm",
			"admin": true
		}))
		.unwrap();

		assert_eq!(
			order,
			Order::Transfer(TransferOrder {
				source_network: Network::Ethereum,
				dest_network: Network::Avalanche,
				amount: "3".to_string(),
				user: "42".to_string(),
				timestamp: TS.to_string(),
			})
		);

		let mut expected: Vec<&str> = vec![
			"type",
			"sourceNetwork",
			"destNetwork",
			"amount",
			"user",
			"timestamp",
		];
		expected.sort();
		let wire = serde_json::to_value(&order).unwrap();
		let mut keys: Vec<&str> = wire
			.as_object()
			.unwrap()
			.keys()
			.map(String::as_str)
			.collect();
		keys.sort();
		assert_eq!(keys, expected);
	}

	#[test]
	fn test_reports_every_violation() {
		let fields = field_errors(json!({
			"type": "send",
			"network": "solana",
			"address": "0x123",
			"amount": "1.234",
			"user": "",
			"timestamp": "yesterday"
		}));

		assert_eq!(
			fields,
			vec!["user", "timestamp", "network", "address", "amount"]
		);
	}

	#[test]
	fn test_buy_network_enum_is_narrower() {
		let fields = field_errors(json!({
			"type": "buy",
			"network": "arbitrum",
			"amount": "10",
			"user": "1",
			"timestamp": TS
		}));
		assert_eq!(fields, vec!["network"]);
	}

	#[test]
	fn test_missing_fields() {
		let fields = field_errors(json!({ "type": "transfer", "amount": "1" }));
		assert_eq!(fields, vec!["user", "timestamp", "sourceNetwork", "destNetwork"]);
	}

	#[test]
	fn test_type_discriminant() {
		assert_eq!(field_errors(json!({ "amount": "1" })), vec!["type"]);
		assert_eq!(field_errors(json!({ "type": "swap" })), vec!["type"]);
		assert_eq!(field_errors(json!({ "type": 3 })), vec!["type"]);
	}

	#[test]
	fn test_timestamp_formats() {
		assert!(is_iso_datetime("2025-06-01T12:30:00Z"));
		assert!(is_iso_datetime("2025-06-01T12:30:00.123Z"));
		assert!(!is_iso_datetime("2025-06-01T12:30:00+02:00"));
		assert!(!is_iso_datetime("2025-06-01"));
		assert!(!is_iso_datetime("2025-13-01T00:00:00Z"));
	}
}
