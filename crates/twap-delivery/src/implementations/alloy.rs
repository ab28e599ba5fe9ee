//! Alloy-based EVM backend.
//!
//! One HTTP provider serves both submission (with the wallet filler
//! signing) and the read-only settler/authorizer views.

use crate::{ChainViewInterface, DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use twap_order::abi::{ISignatureAuthorizer, ITwapSettler};
use twap_types::{Transaction, TransactionHash, TransactionReceipt};

/// Short hash rendering for log lines.
fn truncate_hash(hash: &B256) -> String {
	let hex = hex::encode(hash);
	format!("{}..", &hex[..8])
}

/// Decides whether a node error message is an on-chain rejection (revert)
/// or a transport problem. Rejections keep the node's message verbatim.
fn classify(message: String) -> DeliveryError {
	if message.contains("revert") || message.contains("Rejected") {
		DeliveryError::Rejected(message)
	} else {
		DeliveryError::Network(message)
	}
}

pub struct AlloyChain {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	settler: Address,
	authorizer: Address,
	chain_id: u64,
}

impl AlloyChain {
	/// Connects to the RPC endpoint with a wallet for submission.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		settler: Address,
		authorizer: Address,
		signer: PrivateKeySigner,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Network(format!("Invalid RPC URL: {}", e)))?;

		let wallet = EthereumWallet::from(signer);
		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
			settler,
			authorizer,
			chain_id,
		})
	}

	async fn view_call(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest {
			chain_id: Some(self.chain_id),
			to: Some(alloy_primitives::TxKind::Call(to)),
			input: TransactionInput {
				input: Some(calldata.into()),
				data: None,
			},
			..Default::default()
		};

		self.provider
			.call(&request)
			.await
			.map_err(|e| classify(e.to_string()))
	}
}

#[async_trait]
impl DeliveryInterface for AlloyChain {
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let request: TransactionRequest = tx.into();

		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| classify(e.to_string()))?;

		let tx_hash = *pending.tx_hash();
		info!(tx_hash = %truncate_hash(&tx_hash), "Submitted transaction");

		Ok(tx_hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(*hash)
			.await
			.map_err(|e| DeliveryError::Network(e.to_string()))?;

		Ok(receipt.map(|r| TransactionReceipt {
			hash: r.transaction_hash,
			block_number: r.block_number.unwrap_or(0),
			success: r.status(),
		}))
	}
}

#[async_trait]
impl ChainViewInterface for AlloyChain {
	async fn remaining(&self, order_hash: B256) -> Result<U256, DeliveryError> {
		let calldata = ITwapSettler::remainingCall { orderHash: order_hash }.abi_encode();
		let output = self.view_call(self.settler, calldata).await?;

		let decoded = ITwapSettler::remainingCall::abi_decode_returns(&output, true)
			.map_err(|e| DeliveryError::Network(format!("Bad remaining() response: {}", e)))?;
		debug!(order_hash = %truncate_hash(&order_hash), remaining = %decoded.amount, "Read remaining");

		Ok(decoded.amount)
	}

	async fn nonce_bitmap(&self, owner: Address, word_index: U256) -> Result<U256, DeliveryError> {
		let calldata = ISignatureAuthorizer::nonceBitmapCall {
			owner,
			wordIndex: word_index,
		}
		.abi_encode();
		let output = self.view_call(self.authorizer, calldata).await?;

		let decoded = ISignatureAuthorizer::nonceBitmapCall::abi_decode_returns(&output, true)
			.map_err(|e| DeliveryError::Network(format!("Bad nonceBitmap() response: {}", e)))?;

		Ok(decoded.bitmap)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_classify_splits_reverts_from_transport() {
		assert!(matches!(
			classify("server returned an error: execution reverted: OrderCancelled()".to_string()),
			DeliveryError::Rejected(_)
		));
		assert!(matches!(
			classify("connection refused".to_string()),
			DeliveryError::Network(_)
		));
	}

	#[test]
	fn test_truncate_hash_is_short() {
		let hash = B256::repeat_byte(0xab);
		assert_eq!(truncate_hash(&hash), "abababab..");
	}
}
