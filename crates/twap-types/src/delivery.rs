//! Transaction submission types.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Hash of a submitted transaction.
pub type TransactionHash = B256;

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub hash: TransactionHash,
	pub block_number: u64,
	/// Whether execution succeeded (a mined-but-reverted transaction has
	/// `success == false`).
	pub success: bool,
}
