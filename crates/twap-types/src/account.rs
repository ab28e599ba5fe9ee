//! Signature and transaction types.
//!
//! Signatures are stored in the standard 65-byte Ethereum format (r, s, v)
//! so they round-trip through storage and land on-chain byte-exact.

use alloy_primitives::{Address, Bytes, PrimitiveSignature, TxKind, U256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use serde::{Deserialize, Serialize};

/// A 65-byte secp256k1 signature in (r, s, v) layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Bytes);

impl From<PrimitiveSignature> for Signature {
	fn from(sig: PrimitiveSignature) -> Self {
		let mut bytes = Vec::with_capacity(65);
		bytes.extend_from_slice(&sig.r().to_be_bytes::<32>());
		bytes.extend_from_slice(&sig.s().to_be_bytes::<32>());
		bytes.push(if sig.v() { 28 } else { 27 });
		Signature(bytes.into())
	}
}

impl Signature {
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// A transaction ready for submission to the configured chain.
///
/// All engine transactions are contract calls; gas fields left `None` are
/// filled by the provider at submission time.
#[derive(Debug, Clone)]
pub struct Transaction {
	pub to: Address,
	pub data: Vec<u8>,
	pub value: U256,
	pub chain_id: u64,
	pub nonce: Option<u64>,
	pub gas_limit: Option<u64>,
	pub gas_price: Option<u128>,
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
}

impl Transaction {
	/// A plain contract call with provider-filled gas fields.
	pub fn call(to: Address, data: Vec<u8>, chain_id: u64) -> Self {
		Self {
			to,
			data,
			value: U256::ZERO,
			chain_id,
			nonce: None,
			gas_limit: None,
			gas_price: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}
}

impl From<Transaction> for TransactionRequest {
	fn from(tx: Transaction) -> Self {
		TransactionRequest {
			chain_id: Some(tx.chain_id),
			to: Some(TxKind::Call(tx.to)),
			value: Some(tx.value),
			nonce: tx.nonce,
			gas: tx.gas_limit,
			gas_price: tx.gas_price,
			max_fee_per_gas: tx.max_fee_per_gas,
			max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
			input: TransactionInput {
				input: Some(Bytes::from(tx.data)),
				data: None,
			},
			..Default::default()
		}
	}
}
