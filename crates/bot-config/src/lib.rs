//! Configuration loading for the USDC wallet bot.
//!
//! A configuration file (TOML, YAML or JSON, chosen by extension) is read,
//! `${VAR}` references are substituted from the environment, a small set of
//! prefixed environment variables override individual settings, and the
//! result is validated before any service is built.

use bot_types::Network;
use regex::Regex;
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

mod types;

pub use types::*;

/// Storage backends known to the service.
pub const STORAGE_BACKENDS: &[&str] = &["memory", "file"];
/// Account providers known to the service.
pub const ACCOUNT_PROVIDERS: &[&str] = &["privy", "local"];
/// Queue backends known to the service.
pub const QUEUE_BACKENDS: &[&str] = &["memory"];
/// Delivery providers known to the service.
pub const DELIVERY_PROVIDERS: &[&str] = &["privy"];

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "BOT_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		let mut config = self.load_from_file(file_path).await?;

		self.apply_env_overrides(&mut config)?;

		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<Config, ConfigError> {
		let content = match tokio::fs::read_to_string(file_path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(file_path.to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		let substituted = substitute_env_vars(&content)?;

		match Path::new(file_path).extension().and_then(|s| s.to_str()) {
			Some("toml") => {
				toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
			}
			Some("yaml") | Some("yml") => serde_yaml::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(e.to_string())),
			Some("json") => serde_json::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(e.to_string())),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				file_path
			))),
		}
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.bot.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			config.bot.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		if let Ok(token) = env::var(format!("{}TELEGRAM_TOKEN", self.env_prefix)) {
			debug!("Overriding Telegram token from environment");
			config.telegram.bot_token = token;
		}

		Ok(())
	}
}

/// Replaces every `${VAR_NAME}` with the value of the environment variable.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

/// Checks cross-field constraints serde cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

	if config.telegram.bot_token.trim().is_empty() {
		return invalid("telegram.bot_token must not be empty".to_string());
	}

	if !config.bot.webhook_path.starts_with('/') {
		return invalid("bot.webhook_path must start with '/'".to_string());
	}

	if let Some(url) = &config.bot.public_url {
		if !url.starts_with("https://") {
			return invalid("bot.public_url must start with https://".to_string());
		}
	}

	if !STORAGE_BACKENDS.contains(&config.storage.backend.as_str()) {
		return invalid(format!(
			"Unknown storage backend '{}'",
			config.storage.backend
		));
	}

	if config.storage.session_ttl_secs == 0 {
		return invalid("storage.session_ttl_secs must be greater than zero".to_string());
	}

	if !ACCOUNT_PROVIDERS.contains(&config.account.provider.as_str()) {
		return invalid(format!(
			"Unknown account provider '{}'",
			config.account.provider
		));
	}

	for (name, network) in &config.networks {
		if Network::from_str(name).is_err() {
			return invalid(format!("Unknown network '{}'", name));
		}
		if let Some(url) = &network.rpc_url {
			if !(url.starts_with("http://") || url.starts_with("https://")) {
				return invalid(format!(
					"networks.{}.rpc_url must start with http:// or https://",
					name
				));
			}
		}
	}

	if config.live_networks().is_empty() {
		return invalid("At least one network must have an rpc_url".to_string());
	}

	if !QUEUE_BACKENDS.contains(&config.queue.backend.as_str()) {
		return invalid(format!("Unknown queue backend '{}'", config.queue.backend));
	}

	if config.queue.batch_size == 0 {
		return invalid("queue.batch_size must be greater than zero".to_string());
	}

	if config.queue.max_deliveries == 0 {
		return invalid("queue.max_deliveries must be greater than zero".to_string());
	}

	if config.delivery.enabled && !DELIVERY_PROVIDERS.contains(&config.delivery.provider.as_str())
	{
		return invalid(format!(
			"Unknown delivery provider '{}'",
			config.delivery.provider
		));
	}

	Ok(())
}
