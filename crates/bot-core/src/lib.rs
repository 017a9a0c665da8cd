//! Bot engine: wires the services together and exposes the two entry points,
//! webhook updates and the order queue consumer.

use bot_account::{AccountError, AccountInterface, AccountService};
use bot_balance::{BalanceError, BalanceInterface, BalanceService};
use bot_config::Config;
use bot_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use bot_order::{OrderError, OrderInterface, OrderService};
use bot_queue::{QueueError, QueueInterface, QueueService};
use bot_storage::{StorageError, StorageInterface, StorageService};
use bot_telegram::{MessengerError, MessengerInterface, MessengerService};
use bot_types::{Action, Update};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub mod error;
pub mod flow;
pub mod messages;
pub mod processor;
pub mod router;
pub mod session;

pub use error::{BotError, StepError};

use flow::ConversationFlow;
use processor::OrderProcessor;
use router::Router;
use session::SessionStore;

pub struct BotEngine {
	config: Config,
	sessions: Arc<SessionStore>,
	messenger: Arc<MessengerService>,
	router: Router,
	processor: OrderProcessor,
}

impl BotEngine {
	/// Handles one webhook update.
	pub async fn handle_update(&self, update: Update) {
		self.router.handle_update(update).await;
	}

	/// Runs the order processor until `shutdown` turns true.
	pub async fn run_processor(&self, shutdown: watch::Receiver<bool>) {
		self.processor.run(shutdown).await;
	}

	/// Registers `bot.public_url` + `bot.webhook_path` with Telegram.
	pub async fn register_webhook(&self) -> Result<String, BotError> {
		let url = self
			.config
			.webhook_url()
			.ok_or_else(|| BotError::Config("bot.public_url is not set".into()))?;
		self.messenger
			.set_webhook(&url, self.config.bot.webhook_secret.as_deref())
			.await?;
		info!(url = %url, "Webhook registered");
		Ok(url)
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
}

// Type aliases for factory functions
type StorageFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send>;
type AccountFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send>;
type BalanceFactory = Box<dyn Fn(&str) -> Result<Box<dyn BalanceInterface>, BalanceError> + Send>;
type OrderFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> + Send>;
type QueueFactory = Box<dyn Fn(&toml::Value) -> Result<Box<dyn QueueInterface>, QueueError> + Send>;
type MessengerFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn MessengerInterface>, MessengerError> + Send>;
type DeliveryFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> + Send>;

/// Builds a [`BotEngine`] from configuration and named implementation factories.
pub struct BotBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
	account_factories: HashMap<String, AccountFactory>,
	balance_factory: Option<BalanceFactory>,
	order_factories: HashMap<Action, OrderFactory>,
	queue_factories: HashMap<String, QueueFactory>,
	messenger_factory: Option<MessengerFactory>,
	delivery_factories: HashMap<String, DeliveryFactory>,
}

impl BotBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			account_factories: HashMap::new(),
			balance_factory: None,
			order_factories: HashMap::new(),
			queue_factories: HashMap::new(),
			messenger_factory: None,
			delivery_factories: HashMap::new(),
		}
	}

	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_account_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send + 'static,
	{
		self.account_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Factory called with the RPC URL of every live network.
	pub fn with_balance_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&str) -> Result<Box<dyn BalanceInterface>, BalanceError> + Send + 'static,
	{
		self.balance_factory = Some(Box::new(factory));
		self
	}

	pub fn with_order_factory<F>(mut self, action: Action, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> + Send + 'static,
	{
		self.order_factories.insert(action, Box::new(factory));
		self
	}

	pub fn with_queue_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn QueueInterface>, QueueError> + Send + 'static,
	{
		self.queue_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_messenger_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn MessengerInterface>, MessengerError>
			+ Send
			+ 'static,
	{
		self.messenger_factory = Some(Box::new(factory));
		self
	}

	pub fn with_delivery_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError> + Send + 'static,
	{
		self.delivery_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn build(self) -> Result<BotEngine, BotError> {
		let config = self.config;
		let missing = |kind: &str, name: &str| BotError::Config(format!("No {} factory for '{}'", kind, name));

		// Session storage
		let storage_factory = self
			.storage_factories
			.get(&config.storage.backend)
			.ok_or_else(|| missing("storage", &config.storage.backend))?;
		let storage = Arc::new(StorageService::new(storage_factory(&config.storage.config)?));
		let sessions = Arc::new(SessionStore::new(storage, config.storage.session_ttl()));

		// Custodial wallets
		let account_factory = self
			.account_factories
			.get(&config.account.provider)
			.ok_or_else(|| missing("account", &config.account.provider))?;
		let accounts = Arc::new(AccountService::new(account_factory(&config.account.config)?));

		// Balance readers for live networks
		let balance_factory = self
			.balance_factory
			.ok_or_else(|| BotError::Config("Balance factory not provided".into()))?;
		let mut readers = HashMap::new();
		for network in config.live_networks() {
			let Some(rpc_url) = config.network(network).and_then(|n| n.rpc_url.as_deref()) else {
				continue;
			};
			let reader = balance_factory(rpc_url)
				.map_err(|e| BotError::Config(format!("{} balance reader: {}", network, e)))?;
			readers.insert(network, reader);
		}
		let balances = Arc::new(BalanceService::new(readers, config.balance.timeout()));

		// Order implementations
		let mut order_impls = HashMap::new();
		for (action, table) in [
			(Action::Send, &config.order.send),
			(Action::Transfer, &config.order.transfer),
			(Action::Buy, &config.order.buy),
		] {
			if let Some(factory) = self.order_factories.get(&action) {
				order_impls.insert(action, factory(table)?);
			}
		}
		let orders = Arc::new(OrderService::new(order_impls));

		// Queue
		let queue_factory = self
			.queue_factories
			.get(&config.queue.backend)
			.ok_or_else(|| missing("queue", &config.queue.backend))?;
		let queue_table = toml::Value::try_from(&config.queue)
			.map_err(|e| BotError::Config(format!("queue: {}", e)))?;
		let queue = Arc::new(QueueService::new(queue_factory(&queue_table)?));

		// Telegram
		let messenger_factory = self
			.messenger_factory
			.ok_or_else(|| BotError::Config("Messenger factory not provided".into()))?;
		let telegram_table = toml::Value::try_from(&config.telegram)
			.map_err(|e| BotError::Config(format!("telegram: {}", e)))?;
		let messenger = Arc::new(MessengerService::new(messenger_factory(&telegram_table)?));

		// Optional on-chain submission
		let delivery = if config.delivery.enabled {
			let factory = self
				.delivery_factories
				.get(&config.delivery.provider)
				.ok_or_else(|| missing("delivery", &config.delivery.provider))?;
			Some(Arc::new(DeliveryService::new(factory(&config.delivery.config)?)))
		} else {
			None
		};

		let flow = ConversationFlow::new(
			sessions.clone(),
			accounts.clone(),
			balances,
			orders.clone(),
			queue.clone(),
		);
		let router = Router::new(
			flow,
			sessions.clone(),
			messenger.clone(),
			config.bot.webapp_url.clone(),
		);
		let processor = OrderProcessor::new(
			queue,
			orders,
			accounts,
			messenger.clone(),
			delivery,
			config.queue.batch_size,
			config.queue.poll_interval(),
		);

		Ok(BotEngine {
			config,
			sessions,
			messenger,
			router,
			processor,
		})
	}
}
