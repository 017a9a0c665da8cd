use anyhow::{Context, Result};
use bot_config::{Config, ConfigLoader};
use bot_core::{BotBuilder, BotEngine};
use bot_types::Action;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;

#[derive(Parser)]
#[command(name = "usdc-bot")]
#[command(about = "Telegram USDC wallet bot", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/example.toml")]
	config: PathBuf,

	#[arg(long, env = "BOT_LOG_LEVEL", default_value = "info")]
	log_level: String,

	/// Emit logs as JSON lines
	#[arg(long, env = "BOT_LOG_JSON")]
	log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Serve the webhook and run the order processor
	Start,
	/// Validate the configuration file
	Validate,
	/// Register the webhook URL with Telegram
	SetWebhook,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Initialize tracing
	setup_tracing(&cli.log_level, cli.log_json)?;

	// Handle commands
	match cli.command {
		Some(Commands::Start) | None => start_service(cli).await,
		Some(Commands::Validate) => validate_config(cli).await,
		Some(Commands::SetWebhook) => set_webhook(cli).await,
	}
}

async fn load_config(cli: &Cli) -> Result<Config> {
	info!("Loading configuration from: {:?}", cli.config);
	ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")
}

/// Registers every implementation the binary ships with.
fn build_engine(config: Config) -> Result<BotEngine> {
	BotBuilder::new(config)
		.with_storage_factory("memory", bot_storage::implementations::memory::create_storage)
		.with_storage_factory("file", bot_storage::implementations::file::create_storage)
		.with_account_factory("local", bot_account::implementations::local::create_account)
		.with_account_factory("privy", bot_account::implementations::privy::create_account)
		.with_balance_factory(bot_balance::implementations::alloy::create_balance_reader)
		.with_order_factory(Action::Send, bot_order::implementations::erc20::create_order_impl)
		.with_order_factory(Action::Transfer, bot_order::implementations::cctp::create_order_impl)
		.with_order_factory(Action::Buy, bot_order::implementations::onramp::create_order_impl)
		.with_queue_factory("memory", bot_queue::implementations::memory::create_queue)
		.with_messenger_factory(bot_telegram::implementations::bot_api::create_messenger)
		.with_delivery_factory("privy", bot_delivery::implementations::privy::create_delivery)
		.build()
		.context("Failed to build bot engine")
}

async fn start_service(cli: Cli) -> Result<()> {
	info!("Starting USDC wallet bot");

	let config = load_config(&cli).await?;
	info!("Bot name: {}", config.bot.name);
	info!("Live networks: {:?}", config.live_networks());

	let engine = Arc::new(build_engine(config)?);
	let (shutdown_tx, shutdown_rx) = watch::channel(false);

	// Order processor
	let processor_engine = engine.clone();
	let processor_handle =
		tokio::spawn(async move { processor_engine.run_processor(shutdown_rx).await });

	// Webhook server
	let settings = &engine.config().bot;
	let bind_address = format!("{}:{}", settings.host, settings.http_port);
	let listener = tokio::net::TcpListener::bind(&bind_address)
		.await
		.with_context(|| format!("Failed to bind {}", bind_address))?;
	info!(
		"Webhook listening on {}{}",
		bind_address, settings.webhook_path
	);

	axum::serve(listener, api::router(engine.clone()))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("HTTP server failed")?;

	info!("Shutdown signal received, stopping order processor...");
	let _ = shutdown_tx.send(true);
	if let Err(e) = processor_handle.await {
		error!("Order processor task failed: {}", e);
	}

	info!("USDC wallet bot stopped");
	Ok(())
}

async fn validate_config(cli: Cli) -> Result<()> {
	let config = load_config(&cli).await?;

	info!("Configuration is valid");
	info!("Bot name: {}", config.bot.name);
	info!("  Storage: {}", config.storage.backend);
	info!("  Accounts: {}", config.account.provider);
	info!("  Queue: {}", config.queue.backend);
	for network in config.live_networks() {
		info!("  Network: {}", network.display_name());
	}
	if config.delivery.enabled {
		info!("  Delivery: {}", config.delivery.provider);
	}
	match config.webhook_url() {
		Some(url) => info!("  Webhook: {}", url),
		None => info!("  Webhook: not public (bot.public_url unset)"),
	}

	Ok(())
}

async fn set_webhook(cli: Cli) -> Result<()> {
	let config = load_config(&cli).await?;
	let engine = build_engine(config)?;
	let url = engine
		.register_webhook()
		.await
		.context("Failed to register webhook")?;
	info!("Telegram will deliver updates to {}", url);
	Ok(())
}

fn setup_tracing(log_level: &str, json: bool) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	let registry = tracing_subscriber::registry().with(env_filter);
	if json {
		registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init()?;
	} else {
		registry.with(tracing_subscriber::fmt::layer()).try_init()?;
	}

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
