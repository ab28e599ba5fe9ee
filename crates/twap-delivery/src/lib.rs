//! Transaction submission and on-chain reads.
//!
//! The delivery layer submits exactly one transaction per call and never
//! retries internally; retry and scheduling policy belong to the engine.
//! On-chain rejections are surfaced verbatim so callers can distinguish a
//! consumed authorization nonce from every other failure.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;
use twap_types::{Transaction, TransactionHash, TransactionReceipt};

pub mod implementations {
	pub mod alloy;
}

pub use implementations::alloy::AlloyChain;

/// Revert marker the authorizer contract emits when a nonce's bit is
/// already set.
const NONCE_CONSUMED_MARKER: &str = "InvalidNonce";

#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Transport-level failure; the transaction may not have reached the
	/// network at all.
	#[error("Network error: {0}")]
	Network(String),
	/// The chain rejected the transaction. The message is the node's,
	/// verbatim, never rewritten.
	#[error("Rejected on-chain: {0}")]
	Rejected(String),
}

impl DeliveryError {
	/// Whether this rejection is the authorizer refusing an already
	/// consumed nonce: the one condition the engine retries, by
	/// re-running allocation + re-sign + submission as a unit.
	pub fn is_nonce_already_used(&self) -> bool {
		matches!(self, DeliveryError::Rejected(msg) if msg.contains(NONCE_CONSUMED_MARKER))
	}
}

/// Submits transactions. One transaction per call, no internal retry, no
/// blocking beyond submission.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Reads the receipt of a previously submitted transaction, if mined.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;
}

/// Read-only views over the settler and authorizer contracts.
#[async_trait]
pub trait ChainViewInterface: Send + Sync {
	/// `remaining(orderHash)` on the settler: maker-asset amount still
	/// unfilled for this order.
	async fn remaining(&self, order_hash: B256) -> Result<U256, DeliveryError>;

	/// `nonceBitmap(owner, wordIndex)` on the authorizer.
	async fn nonce_bitmap(&self, owner: Address, word_index: U256) -> Result<U256, DeliveryError>;
}

#[async_trait]
impl<T: DeliveryInterface + ?Sized> DeliveryInterface for std::sync::Arc<T> {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		(**self).submit(tx).await
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		(**self).get_receipt(hash).await
	}
}

#[async_trait]
impl<T: ChainViewInterface + ?Sized> ChainViewInterface for std::sync::Arc<T> {
	async fn remaining(&self, order_hash: B256) -> Result<U256, DeliveryError> {
		(**self).remaining(order_hash).await
	}

	async fn nonce_bitmap(&self, owner: Address, word_index: U256) -> Result<U256, DeliveryError> {
		(**self).nonce_bitmap(owner, word_index).await
	}
}

/// Service wrapper over the configured delivery backend.
pub struct DeliveryService {
	backend: Box<dyn DeliveryInterface>,
}

impl DeliveryService {
	pub fn new(backend: Box<dyn DeliveryInterface>) -> Self {
		Self { backend }
	}

	pub async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.backend.submit(tx).await
	}

	pub async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		self.backend.get_receipt(hash).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_nonce_classifier_only_matches_rejections() {
		let rejected = DeliveryError::Rejected("execution reverted: InvalidNonce()".to_string());
		assert!(rejected.is_nonce_already_used());

		let other = DeliveryError::Rejected("execution reverted: OrderCancelled()".to_string());
		assert!(!other.is_nonce_already_used());

		// A transport error mentioning the marker is still not a rejection.
		let network = DeliveryError::Network("InvalidNonce".to_string());
		assert!(!network.is_nonce_already_used());
	}
}
