//! Configuration types for the bot service.

use bot_types::Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Complete bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Service identity and HTTP settings
	pub bot: BotSettings,
	/// Telegram Bot API access
	pub telegram: TelegramConfig,
	/// Session storage backend
	pub storage: StorageConfig,
	/// Custodial wallet lookup
	pub account: AccountConfig,
	/// Per-network RPC endpoints, keyed by network name
	#[serde(default)]
	pub networks: BTreeMap<String, NetworkConfig>,
	#[serde(default)]
	pub balance: BalanceConfig,
	#[serde(default)]
	pub queue: QueueConfig,
	#[serde(default)]
	pub order: OrderConfig,
	#[serde(default)]
	pub delivery: DeliveryConfig,
}

impl Config {
	/// Settings of a network, if present in the file.
	pub fn network(&self, network: Network) -> Option<&NetworkConfig> {
		self.networks.get(network.as_str())
	}

	/// Networks with an RPC endpoint configured.
	pub fn live_networks(&self) -> Vec<Network> {
		self.networks
			.iter()
			.filter(|(_, cfg)| cfg.rpc_url.is_some())
			.filter_map(|(name, _)| Network::from_str(name).ok())
			.collect()
	}

	/// Full URL Telegram should deliver updates to.
	pub fn webhook_url(&self) -> Option<String> {
		self.bot.public_url.as_ref().map(|base| {
			format!("{}{}", base.trim_end_matches('/'), self.bot.webhook_path)
		})
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotSettings {
	#[serde(default = "default_name")]
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	/// Path of the webhook route
	#[serde(default = "default_webhook_path")]
	pub webhook_path: String,
	/// Public HTTPS base URL, used when registering the webhook
	#[serde(default)]
	pub public_url: Option<String>,
	/// Mini app URL opened by the /start button
	#[serde(default)]
	pub webapp_url: Option<String>,
	/// Expected `X-Telegram-Bot-Api-Secret-Token` header value
	#[serde(default)]
	pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
	pub bot_token: String,
	#[serde(default = "default_telegram_api_url")]
	pub api_url: String,
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// `memory` or `file`
	pub backend: String,
	/// Idle lifetime of a conversation
	#[serde(default = "default_session_ttl_secs")]
	pub session_ttl_secs: u64,
	/// Backend specific settings
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

impl StorageConfig {
	pub fn session_ttl(&self) -> Duration {
		Duration::from_secs(self.session_ttl_secs)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// `privy` or `local`
	pub provider: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// JSON-RPC endpoint; a network without one reads as zero balance
	#[serde(default)]
	pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BalanceConfig {
	/// Per-chain read timeout
	#[serde(default = "default_balance_timeout_ms")]
	pub timeout_ms: u64,
}

impl Default for BalanceConfig {
	fn default() -> Self {
		Self {
			timeout_ms: default_balance_timeout_ms(),
		}
	}
}

impl BalanceConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
	#[serde(default = "default_queue_backend")]
	pub backend: String,
	/// Messages handed to the processor per receive
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	/// Longest wait for a non-empty batch
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Time before an unacknowledged message is redelivered
	#[serde(default = "default_visibility_timeout_secs")]
	pub visibility_timeout_secs: u64,
	/// Deliveries before a message is dead-lettered
	#[serde(default = "default_max_deliveries")]
	pub max_deliveries: u32,
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self {
			backend: default_queue_backend(),
			batch_size: default_batch_size(),
			poll_interval_ms: default_poll_interval_ms(),
			visibility_timeout_secs: default_visibility_timeout_secs(),
			max_deliveries: default_max_deliveries(),
		}
	}
}

impl QueueConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn visibility_timeout(&self) -> Duration {
		Duration::from_secs(self.visibility_timeout_secs)
	}
}

/// Order encoding settings, one table per order type.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderConfig {
	#[serde(default = "empty_table")]
	pub send: toml::Value,
	#[serde(default = "empty_table")]
	pub transfer: toml::Value,
	#[serde(default = "empty_table")]
	pub buy: toml::Value,
}

impl Default for OrderConfig {
	fn default() -> Self {
		Self {
			send: empty_table(),
			transfer: empty_table(),
			buy: empty_table(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Submit built transactions instead of only reporting them
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_delivery_provider")]
	pub provider: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			provider: default_delivery_provider(),
			config: empty_table(),
		}
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::Table::new())
}

fn default_name() -> String {
	"usdc-bot".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_host() -> String {
	"0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
	8080
}

fn default_webhook_path() -> String {
	"/api/telegram/bot/webhook".to_string()
}

fn default_telegram_api_url() -> String {
	"https://api.telegram.org".to_string()
}

fn default_timeout_secs() -> u64 {
	10
}

fn default_session_ttl_secs() -> u64 {
	1800
}

fn default_balance_timeout_ms() -> u64 {
	5000
}

fn default_queue_backend() -> String {
	"memory".to_string()
}

fn default_batch_size() -> usize {
	10
}

fn default_poll_interval_ms() -> u64 {
	1000
}

fn default_visibility_timeout_secs() -> u64 {
	30
}

fn default_max_deliveries() -> u32 {
	5
}

fn default_delivery_provider() -> String {
	"privy".to_string()
}
