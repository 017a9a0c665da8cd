//! Queue consumer turning orders into wallet calls.
//!
//! Messages of a batch are handled one after the other. A message is
//! acknowledged only once the user has been told about the result; any
//! failure before that leaves it for redelivery.

use crate::error::BotError;
use crate::messages;
use bot_account::AccountService;
use bot_delivery::DeliveryService;
use bot_order::{OrderError, OrderService};
use bot_queue::{QueueMessage, QueueService};
use bot_telegram::MessengerService;
use bot_types::{Action, Order, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// Processed and acknowledged.
	Done,
	/// Could never be processed; acknowledged to stop redelivery.
	Discarded,
}

pub struct OrderProcessor {
	queue: Arc<QueueService>,
	orders: Arc<OrderService>,
	accounts: Arc<AccountService>,
	messenger: Arc<MessengerService>,
	delivery: Option<Arc<DeliveryService>>,
	batch_size: usize,
	poll_interval: Duration,
}

impl OrderProcessor {
	pub fn new(
		queue: Arc<QueueService>,
		orders: Arc<OrderService>,
		accounts: Arc<AccountService>,
		messenger: Arc<MessengerService>,
		delivery: Option<Arc<DeliveryService>>,
		batch_size: usize,
		poll_interval: Duration,
	) -> Self {
		Self {
			queue,
			orders,
			accounts,
			messenger,
			delivery,
			batch_size,
			poll_interval,
		}
	}

	/// Consumes the queue until `shutdown` turns true.
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
		info!(batch_size = self.batch_size, "Order processor started");
		loop {
			tokio::select! {
				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						break;
					}
				}
				received = self.queue.receive(self.batch_size, self.poll_interval) => {
					match received {
						Ok(batch) => self.process_batch(batch).await,
						Err(e) => {
							error!(error = %e, "Failed to receive from queue");
							tokio::time::sleep(self.poll_interval).await;
						}
					}
				}
			}
		}
		info!("Order processor stopped");
	}

	/// Processes messages sequentially, acknowledging the ones that succeed.
	pub async fn process_batch(&self, batch: Vec<QueueMessage>) {
		for message in batch {
			match self.process(&message).await {
				Ok(outcome) => {
					if let Err(e) = self.queue.ack(message.id).await {
						error!(message_id = %message.id, error = %e, "Failed to acknowledge message");
					} else if outcome == Outcome::Done {
						info!(message_id = %message.id, "Message processed");
					}
				}
				Err(e) => {
					error!(
						message_id = %message.id,
						attempts = message.attempts,
						error = %e,
						"Error processing message, leaving it for redelivery"
					);
				}
			}
		}
	}

	async fn process(&self, message: &QueueMessage) -> Result<Outcome, BotError> {
		let order = match self.orders.validate(&message.body) {
			Ok(order) => order,
			Err(e) => {
				error!(message_id = %message.id, body = %message.body, error = %e, "Discarding invalid order");
				return Ok(Outcome::Discarded);
			}
		};

		info!(
			message_id = %message.id,
			action = %order.action(),
			user_id = %order.user(),
			network = %order.network(),
			amount = %order.amount(),
			"Processing order"
		);
		if order.action() == Action::Buy {
			info!(message_id = %message.id, "Buy order recorded, purchase completes in the onramp");
			return Ok(Outcome::Done);
		}

		// Replies go to the private chat, whose id is the user id.
		let Ok(chat_id) = order.user().parse::<i64>() else {
			error!(message_id = %message.id, user_id = %order.user(), "Discarding order without a numeric user id");
			return Ok(Outcome::Discarded);
		};
		let wallet = self.accounts.wallet(order.user()).await?;
		let txs = match self.orders.build_transactions(&order, &wallet) {
			Ok(txs) => txs,
			Err(
				e @ (OrderError::Validation(_)
				| OrderError::TypeMismatch { .. }
				| OrderError::InvalidAmount(_)
				| OrderError::InvalidAddress(_)),
			) => {
				error!(message_id = %message.id, error = %e, "Discarding order that cannot be built");
				return Ok(Outcome::Discarded);
			}
			Err(e) => return Err(e.into()),
		};

		let hashes = match &self.delivery {
			Some(delivery) => {
				let body = serde_json::to_vec(&message.body)
					.map_err(|e| BotError::InvalidMessage(e.to_string()))?;
				delivery.deliver_all(&wallet, &txs, &body).await?
			}
			None => Vec::new(),
		};

		let report = report(chat_id, &order, &wallet.address.to_string(), &txs, &hashes)?;
		self.messenger.send(&report).await?;
		Ok(Outcome::Done)
	}
}

fn report(
	chat_id: i64,
	order: &Order,
	wallet: &str,
	txs: &[bot_types::Transaction],
	hashes: &[bot_types::TransactionHash],
) -> Result<OutboundMessage, BotError> {
	match order {
		Order::Send(send) => {
			let tx = txs
				.last()
				.ok_or_else(|| BotError::InvalidMessage("send order produced no call".to_string()))?;
			Ok(messages::send_report(
				chat_id,
				send.network,
				wallet,
				&send.address,
				&send.amount,
				tx,
				hashes,
			))
		}
		Order::Transfer(transfer) => Ok(messages::transfer_report(
			chat_id,
			transfer.source_network,
			transfer.dest_network,
			&transfer.amount,
			txs,
			hashes,
		)),
		Order::Buy(_) => Err(BotError::Order(OrderError::Unsupported(order.action()))),
	}
}
