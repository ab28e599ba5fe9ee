use super::*;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast::error::TryRecvError;
use twap_account::{AccountService, LocalWallet};
use twap_delivery::DeliveryInterface;
use twap_order::{encode_interactions, OrderParams, SigningDomain};
use twap_schedule::ScheduleParams;
use twap_storage::FileStorage;
use twap_types::{Authorization, Transaction, TransactionHash, TransactionReceipt};

const NOW: u64 = 1_700_000_000;
const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

fn settler() -> Address {
	Address::repeat_byte(0x55)
}

struct MockChain {
	bitmap: U256,
	remaining: Option<u64>,
}

#[async_trait]
impl ChainViewInterface for MockChain {
	async fn remaining(&self, _order_hash: B256) -> Result<U256, DeliveryError> {
		match self.remaining {
			Some(amount) => Ok(U256::from(amount)),
			None => Err(DeliveryError::Network("no response".to_string())),
		}
	}

	async fn nonce_bitmap(&self, _owner: Address, _word: U256) -> Result<U256, DeliveryError> {
		Ok(self.bitmap)
	}
}

enum Scripted {
	Accept,
	Reject(&'static str),
}

/// Delivery backend that replays a script of outcomes and records every
/// submission it saw.
struct MockDelivery {
	script: Mutex<VecDeque<Scripted>>,
	submitted: Mutex<Vec<Transaction>>,
}

impl MockDelivery {
	fn new(script: Vec<Scripted>) -> Self {
		Self {
			script: Mutex::new(script.into()),
			submitted: Mutex::new(Vec::new()),
		}
	}
}

#[async_trait]
impl DeliveryInterface for MockDelivery {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.submitted.lock().unwrap().push(tx);
		let step = self.script.lock().unwrap().pop_front();
		match step {
			Some(Scripted::Accept) | None => Ok(B256::repeat_byte(0xf1)),
			Some(Scripted::Reject(msg)) => Err(DeliveryError::Rejected(msg.to_string())),
		}
	}

	async fn get_receipt(
		&self,
		_hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		Ok(None)
	}
}

fn signed_record(total: u64, authorization: Option<Authorization>) -> OrderRecord {
	let schedule = ScheduleParams {
		chunk_amount: U256::from(100u64),
		interval_secs: 3600,
		slippage_percent: 0,
		total_amount: Some(U256::from(total)),
		end_date: None,
		quoted_chunk_output: None,
	}
	.build(NOW)
	.unwrap();

	let order = OrderParams {
		maker: Address::repeat_byte(0x11),
		maker_asset: Address::repeat_byte(0x22),
		taker_asset: Address::repeat_byte(0x33),
		making_amount: U256::from(total),
		taking_amount: U256::from(2 * total),
		receiver: None,
		allowed_sender: None,
		salt: Some(U256::from(1u64)),
		end_date: None,
		permit: alloy_primitives::Bytes::new(),
		interactions: encode_interactions(Address::repeat_byte(0xaa), Some(&schedule), None),
	}
	.build()
	.unwrap();

	let signed = twap_types::SignedOrder {
		order_hash: B256::repeat_byte(0x77),
		signature: twap_types::Signature(vec![0x01; 65].into()),
		order,
	};

	OrderRecord::new(signed, schedule, authorization)
}

fn engine(
	dir: &tempfile::TempDir,
	delivery: Arc<MockDelivery>,
	chain: MockChain,
) -> TwapEngine {
	let wallet = LocalWallet::new(TEST_KEY).unwrap();
	let account = Arc::new(AccountService::new(Box::new(wallet)));
	let signer = OrderSigner::new(
		SigningDomain {
			chain_id: 1,
			settler: settler(),
			authorizer: Address::repeat_byte(0x66),
		},
		Some(account),
	);

	let storage = StorageService::new(Box::new(FileStorage::new(dir.path().to_path_buf())));

	EngineBuilder::new()
		.with_settings(EngineSettings {
			chain_id: 1,
			settler: settler(),
			poll_interval_secs: 30,
			authorization_window_secs: 3600,
		})
		.with_storage(Arc::new(storage))
		.with_delivery(Arc::new(DeliveryService::new(Box::new(delivery))))
		.with_chain_view(Arc::new(chain))
		.with_signer(Arc::new(signer))
		.build()
		.unwrap()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
	let mut events = Vec::new();
	loop {
		match rx.try_recv() {
			Ok(event) => events.push(event),
			Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
			Err(TryRecvError::Lagged(_)) => continue,
		}
	}
	events
}

#[tokio::test]
async fn test_due_fill_is_submitted_and_recorded() {
	let dir = tempfile::tempdir().unwrap();
	let delivery = Arc::new(MockDelivery::new(vec![Scripted::Accept]));
	let engine = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::ZERO,
			remaining: Some(1000),
		},
	);

	let record = signed_record(1000, None);
	let order_hash = record.signed.order_hash;
	engine.track_order(record).await.unwrap();

	let mut rx = engine.event_bus().subscribe();
	engine.tick(NOW + 3601).await;

	assert_eq!(delivery.submitted.lock().unwrap().len(), 1);
	let events = drain(&mut rx);
	assert!(events
		.iter()
		.any(|e| matches!(e, EngineEvent::FillSubmitted { cycle: 1, .. })));

	// Cumulative count survives a reload.
	let stored: OrderRecord = engine
		.storage
		.retrieve(ORDERS_NAMESPACE, &format!("{:x}", order_hash))
		.await
		.unwrap();
	assert_eq!(stored.fills_submitted, 1);
	assert_eq!(stored.fill_history.len(), 1);
}

#[tokio::test]
async fn test_fill_waits_for_due_time() {
	let dir = tempfile::tempdir().unwrap();
	let delivery = Arc::new(MockDelivery::new(vec![Scripted::Accept]));
	let engine = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::ZERO,
			remaining: Some(1000),
		},
	);

	engine.track_order(signed_record(1000, None)).await.unwrap();
	engine.tick(NOW + 100).await;

	assert!(delivery.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejection_reports_cycle_and_keeps_schedule() {
	let dir = tempfile::tempdir().unwrap();
	let delivery = Arc::new(MockDelivery::new(vec![
		Scripted::Reject("execution reverted: TakingAmountTooHigh()"),
		Scripted::Accept,
	]));
	let engine = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::ZERO,
			remaining: Some(1000),
		},
	);

	let record = signed_record(1000, None);
	let order_hash = record.signed.order_hash;
	engine.track_order(record).await.unwrap();

	let mut rx = engine.event_bus().subscribe();
	engine.tick(NOW + 3601).await;

	let events = drain(&mut rx);
	assert!(events.iter().any(|e| matches!(
		e,
		EngineEvent::FillRejected { cycle: 1, reason, .. } if reason.contains("TakingAmountTooHigh")
	)));

	// The same cycle goes out again next tick; nothing was skipped.
	engine.tick(NOW + 3700).await;
	let stored: OrderRecord = engine
		.storage
		.retrieve(ORDERS_NAMESPACE, &format!("{:x}", order_hash))
		.await
		.unwrap();
	assert_eq!(stored.fills_submitted, 1);
	assert_eq!(delivery.submitted.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_consumed_nonce_rotates_and_resubmits_once() {
	let dir = tempfile::tempdir().unwrap();
	let delivery = Arc::new(MockDelivery::new(vec![
		Scripted::Reject("execution reverted: InvalidNonce()"),
		Scripted::Accept,
	]));
	// Bits 0..=2 already consumed on-chain.
	let engine = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::from(0b0111u8),
			remaining: Some(1000),
		},
	);

	let authorization = Authorization {
		token: Address::repeat_byte(0x22),
		spender: settler(),
		amount: U256::from(1000u64),
		nonce: U256::ZERO,
		deadline: NOW + 7200,
		signature: twap_types::Signature(vec![0x02; 65].into()),
	};
	let record = signed_record(1000, Some(authorization));
	let order_hash = record.signed.order_hash;
	engine.track_order(record).await.unwrap();

	let mut rx = engine.event_bus().subscribe();
	engine.tick(NOW + 3601).await;

	let events = drain(&mut rx);
	assert!(events.iter().any(|e| matches!(
		e,
		EngineEvent::AuthorizationRotated { nonce, .. } if *nonce == U256::from(3u64)
	)));
	assert!(events
		.iter()
		.any(|e| matches!(e, EngineEvent::FillSubmitted { cycle: 1, .. })));
	assert_eq!(delivery.submitted.lock().unwrap().len(), 2);

	let stored: OrderRecord = engine
		.storage
		.retrieve(ORDERS_NAMESPACE, &format!("{:x}", order_hash))
		.await
		.unwrap();
	assert_eq!(stored.authorization.unwrap().nonce, U256::from(3u64));
}

#[tokio::test]
async fn test_final_fill_announces_completion() {
	let dir = tempfile::tempdir().unwrap();
	let delivery = Arc::new(MockDelivery::new(vec![Scripted::Accept]));
	let engine = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::ZERO,
			remaining: Some(100),
		},
	);

	// One cycle total.
	engine.track_order(signed_record(100, None)).await.unwrap();

	let mut rx = engine.event_bus().subscribe();
	engine.tick(NOW + 3601).await;

	let events = drain(&mut rx);
	assert!(events
		.iter()
		.any(|e| matches!(e, EngineEvent::ScheduleCompleted { .. })));

	// Exhausted orders drop out of tracking on the following tick.
	engine.tick(NOW + 7300).await;
	assert_eq!(delivery.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_resume_restores_tracked_orders() {
	let dir = tempfile::tempdir().unwrap();

	{
		let delivery = Arc::new(MockDelivery::new(vec![]));
		let engine = engine(
			&dir,
			delivery,
			MockChain {
				bitmap: U256::ZERO,
				remaining: Some(1000),
			},
		);
		engine.track_order(signed_record(1000, None)).await.unwrap();
	}

	let delivery = Arc::new(MockDelivery::new(vec![Scripted::Accept]));
	let restarted = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::ZERO,
			remaining: Some(1000),
		},
	);
	assert_eq!(restarted.resume().await.unwrap(), 1);

	restarted.tick(NOW + 3601).await;
	assert_eq!(delivery.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancellation_is_independent_of_polling() {
	let dir = tempfile::tempdir().unwrap();
	let delivery = Arc::new(MockDelivery::new(vec![Scripted::Accept]));
	let engine = engine(
		&dir,
		delivery.clone(),
		MockChain {
			bitmap: U256::ZERO,
			remaining: Some(1000),
		},
	);

	let record = signed_record(1000, None);
	let order_hash = record.signed.order_hash;
	engine.track_order(record).await.unwrap();

	let tx_hash = engine.cancel_order(order_hash).await.unwrap();
	assert_eq!(tx_hash, B256::repeat_byte(0xf1));
	assert_eq!(delivery.submitted.lock().unwrap().len(), 1);

	assert!(matches!(
		engine.cancel_order(B256::repeat_byte(0x01)).await,
		Err(EngineError::UnknownOrder(_))
	));
}
