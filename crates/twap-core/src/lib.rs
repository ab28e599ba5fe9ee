//! The TWAP engine.
//!
//! The engine is the single external poller the rest of the system assumes:
//! it owns the tick timer, consults the execution-state tracker each cycle,
//! and submits at most one fill per order per tick, in non-decreasing cycle
//! order. A missed cycle delays subsequent ones; nothing is compressed or
//! backfilled. Per-cycle failures are reported and the remaining schedule
//! continues.

use alloy_primitives::{B256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use twap_delivery::{ChainViewInterface, DeliveryError, DeliveryService};
use twap_order::{
	cancel_transaction, fill_transaction, first_free_nonce, signer::authorization_deadline,
	NonceError, OrderError, OrderSigner,
};
use twap_storage::{StorageError, StorageService};
use twap_tracker::ExecutionStateTracker;
use twap_types::{
	EngineEvent, ExecutionState, FillRecord, OrderRecord, StateSource, StopCondition,
};

pub mod event_bus;

pub use event_bus::EventBus;

const ORDERS_NAMESPACE: &str = "orders";

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Order error: {0}")]
	Order(#[from] OrderError),
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	#[error("Nonce error: {0}")]
	Nonce(#[from] NonceError),
	#[error("Unknown order: {0}")]
	UnknownOrder(B256),
}

/// Chain-facing settings the engine needs beyond its service handles.
#[derive(Debug, Clone)]
pub struct EngineSettings {
	pub chain_id: u64,
	pub settler: alloy_primitives::Address,
	pub poll_interval_secs: u64,
	pub authorization_window_secs: u64,
}

struct TrackedOrder {
	record: OrderRecord,
	tracker: ExecutionStateTracker,
}

pub struct TwapEngine {
	settings: EngineSettings,
	storage: Arc<StorageService>,
	delivery: Arc<DeliveryService>,
	chain: Arc<dyn ChainViewInterface>,
	signer: Arc<OrderSigner>,
	orders: RwLock<HashMap<B256, TrackedOrder>>,
	event_bus: EventBus,
}

impl TwapEngine {
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Registers a freshly signed order: persists the record and starts
	/// tracking it.
	pub async fn track_order(&self, record: OrderRecord) -> Result<(), EngineError> {
		let order_hash = record.signed.order_hash;
		self.persist(&record).await?;

		let tracker = self.tracker_for(&record);
		self.orders
			.write()
			.await
			.insert(order_hash, TrackedOrder { record, tracker });

		info!(order_hash = %order_hash, "Tracking order");
		Ok(())
	}

	/// Reloads every persisted order so tracking resumes after a restart.
	pub async fn resume(&self) -> Result<usize, EngineError> {
		let ids = self.storage.list_ids(ORDERS_NAMESPACE).await?;
		let mut orders = self.orders.write().await;

		for id in &ids {
			let record: OrderRecord = self.storage.retrieve(ORDERS_NAMESPACE, id).await?;
			let order_hash = record.signed.order_hash;
			let tracker = self.tracker_for(&record);
			orders.insert(order_hash, TrackedOrder { record, tracker });
		}

		info!(count = ids.len(), "Resumed tracked orders from storage");
		Ok(ids.len())
	}

	/// Runs the poll loop until shutdown is signalled.
	pub async fn run(&self) -> Result<(), EngineError> {
		self.resume().await?;

		let mut ticker =
			tokio::time::interval(Duration::from_secs(self.settings.poll_interval_secs));

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					self.tick(unix_now()).await;
				}
				_ = tokio::signal::ctrl_c() => {
					info!("Shutdown signal received, stopping engine");
					break;
				}
			}
		}

		Ok(())
	}

	/// One engine cycle: poll every tracked order and submit whatever is
	/// due. Per-order failures are reported and do not abort the tick.
	pub async fn tick(&self, now: u64) {
		let hashes: Vec<B256> = self.orders.read().await.keys().copied().collect();

		for order_hash in hashes {
			if let Err(e) = self.process_order(order_hash, now).await {
				error!(order_hash = %order_hash, error = %e, "Order cycle failed");
			}
		}
	}

	/// Polls a single order once and returns the fresh snapshot. Used by
	/// one-shot status queries.
	pub async fn poll_once(&self, order_hash: B256) -> Result<Arc<ExecutionState>, EngineError> {
		let orders = self.orders.read().await;
		let tracked = orders
			.get(&order_hash)
			.ok_or(EngineError::UnknownOrder(order_hash))?;
		let state = tracked.tracker.poll(unix_now()).await;
		Ok(state)
	}

	/// Submits the on-chain cancellation for an order. Independent of the
	/// poll loop: callers may cancel whether or not anything still polls.
	pub async fn cancel_order(&self, order_hash: B256) -> Result<B256, EngineError> {
		let orders = self.orders.read().await;
		let tracked = orders
			.get(&order_hash)
			.ok_or(EngineError::UnknownOrder(order_hash))?;

		let tx = cancel_transaction(
			&tracked.record.signed.order,
			self.settings.settler,
			self.settings.chain_id,
		);
		let tx_hash = self.delivery.submit(tx).await?;

		self.event_bus.publish(EngineEvent::CancellationSubmitted {
			order_hash,
			tx_hash,
		});
		info!(order_hash = %order_hash, tx_hash = %tx_hash, "Cancellation submitted");
		Ok(tx_hash)
	}

	async fn process_order(&self, order_hash: B256, now: u64) -> Result<(), EngineError> {
		let state = {
			let orders = self.orders.read().await;
			let Some(tracked) = orders.get(&order_hash) else {
				return Ok(());
			};
			tracked.tracker.poll(now).await
		};

		self.event_bus.publish(EngineEvent::StateUpdated {
			state: (*state).clone(),
		});

		let mut orders = self.orders.write().await;
		let Some(tracked) = orders.get_mut(&order_hash) else {
			return Ok(());
		};

		if tracked.record.schedule.is_inert() {
			// An already-elapsed end date is an explicit no-op.
			self.event_bus
				.publish(EngineEvent::ScheduleCompleted { order_hash });
			info!(order_hash = %order_hash, "Schedule inert, untracking");
			orders.remove(&order_hash);
			return Ok(());
		}

		if tracked.record.schedule_exhausted() {
			// Completion was announced when the final fill went out.
			info!(order_hash = %order_hash, "Schedule exhausted, untracking");
			orders.remove(&order_hash);
			return Ok(());
		}

		// A confirmed zero remaining means takers exhausted the order
		// ahead of our own accounting.
		if state.source == StateSource::OnChainConfirmed && state.remaining_amount.is_zero() {
			self.event_bus
				.publish(EngineEvent::ScheduleCompleted { order_hash });
			info!(order_hash = %order_hash, "Order fully filled on-chain, untracking");
			orders.remove(&order_hash);
			return Ok(());
		}

		// Fills go out in cycle order; cycle k is due at created_at + k*interval.
		let next_cycle = tracked.record.fills_submitted + 1;
		if now < tracked.record.schedule.due_at(next_cycle) {
			return Ok(());
		}

		self.submit_fill(tracked, next_cycle, now).await
	}

	async fn submit_fill(
		&self,
		tracked: &mut TrackedOrder,
		cycle: u64,
		now: u64,
	) -> Result<(), EngineError> {
		let order_hash = tracked.record.signed.order_hash;
		let chunk = tracked.record.schedule.chunk_in_amount;

		let tx = fill_transaction(
			&tracked.record.signed,
			chunk,
			tracked.record.authorization.as_ref(),
			self.settings.settler,
			self.settings.chain_id,
		);

		match self.delivery.submit(tx).await {
			Ok(tx_hash) => {
				self.record_fill(tracked, cycle, tx_hash, now).await?;
				Ok(())
			}
			Err(e) if e.is_nonce_already_used() && tracked.record.authorization.is_some() => {
				// Advisory allocation lost the race; retry allocation +
				// re-sign + submission as one unit, once.
				warn!(order_hash = %order_hash, "Authorization nonce consumed, rotating");
				self.rotate_authorization(tracked, now).await?;

				let retry_tx = fill_transaction(
					&tracked.record.signed,
					chunk,
					tracked.record.authorization.as_ref(),
					self.settings.settler,
					self.settings.chain_id,
				);
				match self.delivery.submit(retry_tx).await {
					Ok(tx_hash) => {
						self.record_fill(tracked, cycle, tx_hash, now).await?;
						Ok(())
					}
					Err(retry_err) => {
						self.report_rejection(order_hash, cycle, &retry_err);
						Ok(())
					}
				}
			}
			Err(e) => {
				// Surfaced verbatim, never retried here; the schedule
				// continues next tick.
				self.report_rejection(order_hash, cycle, &e);
				Ok(())
			}
		}
	}

	async fn record_fill(
		&self,
		tracked: &mut TrackedOrder,
		cycle: u64,
		tx_hash: B256,
		now: u64,
	) -> Result<(), EngineError> {
		let order_hash = tracked.record.signed.order_hash;

		tracked.record.fills_submitted = cycle;
		tracked.record.fill_history.push(FillRecord {
			cycle,
			tx_hash,
			submitted_at: now,
		});
		self.persist(&tracked.record).await?;

		self.event_bus.publish(EngineEvent::FillSubmitted {
			order_hash,
			cycle,
			tx_hash,
		});
		info!(order_hash = %order_hash, cycle, tx_hash = %tx_hash, "Fill submitted");

		if tracked.record.schedule_exhausted() {
			self.event_bus
				.publish(EngineEvent::ScheduleCompleted { order_hash });
		}
		Ok(())
	}

	/// Allocates a fresh nonce from the current on-chain bitmap and
	/// re-signs the transfer authorization against it.
	async fn rotate_authorization(
		&self,
		tracked: &mut TrackedOrder,
		now: u64,
	) -> Result<(), EngineError> {
		let order_hash = tracked.record.signed.order_hash;
		let maker = tracked.record.signed.order.maker;

		let bitmap = self.chain.nonce_bitmap(maker, U256::ZERO).await?;
		let nonce = first_free_nonce(bitmap)?;

		let end_date = match tracked.record.schedule.stop {
			StopCondition::EndDate(end) => Some(end),
			_ => None,
		};
		let deadline =
			authorization_deadline(end_date, now, self.settings.authorization_window_secs);

		let authorization = self
			.signer
			.sign_authorization(
				tracked.record.signed.order.maker_asset,
				self.settings.settler,
				tracked.record.signed.order.making_amount,
				nonce,
				deadline,
				now,
			)
			.await?;

		let nonce = authorization.nonce;
		tracked.record.authorization = Some(authorization);
		self.persist(&tracked.record).await?;

		self.event_bus
			.publish(EngineEvent::AuthorizationRotated { order_hash, nonce });
		Ok(())
	}

	fn report_rejection(&self, order_hash: B256, cycle: u64, error: &DeliveryError) {
		warn!(order_hash = %order_hash, cycle, error = %error, "Fill not accepted");
		self.event_bus.publish(EngineEvent::FillRejected {
			order_hash,
			cycle,
			reason: error.to_string(),
		});
	}

	fn tracker_for(&self, record: &OrderRecord) -> ExecutionStateTracker {
		ExecutionStateTracker::new(
			record.signed.order_hash,
			record.signed.order.making_amount,
			record.schedule.clone(),
			self.chain.clone(),
		)
	}

	async fn persist(&self, record: &OrderRecord) -> Result<(), EngineError> {
		let id = format!("{:x}", record.signed.order_hash);
		self.storage.store(ORDERS_NAMESPACE, &id, record).await?;
		Ok(())
	}
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Wires the engine from its service parts.
pub struct EngineBuilder {
	settings: Option<EngineSettings>,
	storage: Option<Arc<StorageService>>,
	delivery: Option<Arc<DeliveryService>>,
	chain: Option<Arc<dyn ChainViewInterface>>,
	signer: Option<Arc<OrderSigner>>,
}

impl EngineBuilder {
	pub fn new() -> Self {
		Self {
			settings: None,
			storage: None,
			delivery: None,
			chain: None,
			signer: None,
		}
	}

	pub fn with_settings(mut self, settings: EngineSettings) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn with_storage(mut self, storage: Arc<StorageService>) -> Self {
		self.storage = Some(storage);
		self
	}

	pub fn with_delivery(mut self, delivery: Arc<DeliveryService>) -> Self {
		self.delivery = Some(delivery);
		self
	}

	pub fn with_chain_view(mut self, chain: Arc<dyn ChainViewInterface>) -> Self {
		self.chain = Some(chain);
		self
	}

	pub fn with_signer(mut self, signer: Arc<OrderSigner>) -> Self {
		self.signer = Some(signer);
		self
	}

	pub fn build(self) -> Result<TwapEngine, EngineError> {
		let settings = self
			.settings
			.ok_or_else(|| EngineError::Config("Engine settings not provided".into()))?;
		if settings.poll_interval_secs == 0 {
			return Err(EngineError::Config(
				"Poll interval must be greater than zero".into(),
			));
		}

		Ok(TwapEngine {
			settings,
			storage: self
				.storage
				.ok_or_else(|| EngineError::Config("Storage service not provided".into()))?,
			delivery: self
				.delivery
				.ok_or_else(|| EngineError::Config("Delivery service not provided".into()))?,
			chain: self
				.chain
				.ok_or_else(|| EngineError::Config("Chain view not provided".into()))?,
			signer: self
				.signer
				.ok_or_else(|| EngineError::Config("Order signer not provided".into()))?,
			orders: RwLock::new(HashMap::new()),
			event_bus: EventBus::new(1000),
		})
	}
}

impl Default for EngineBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests;
