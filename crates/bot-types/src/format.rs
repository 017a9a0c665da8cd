//! Lexical checks for user-entered amounts and addresses.
//!
//! Patterns use `[0-9]` rather than `\d`, which also matches non-ASCII digits.

use regex::Regex;
use std::sync::LazyLock;

static DECIMAL_AMOUNT: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]{1,2})?$").ok());

static HEX_ADDRESS: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
	pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Whole dollars with at most two decimals, e.g. `12` or `12.34`.
pub fn is_decimal_amount(value: &str) -> bool {
	matches(&DECIMAL_AMOUNT, value)
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_hex_address(value: &str) -> bool {
	matches(&HEX_ADDRESS, value)
}
