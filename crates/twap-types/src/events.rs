//! Engine events.
//!
//! Published on the engine's broadcast bus so observers (CLI output, a
//! future UI tap) can follow execution without coupling to the poll loop.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::ExecutionState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
	/// A fill transaction left the engine.
	FillSubmitted {
		order_hash: B256,
		cycle: u64,
		tx_hash: B256,
	},
	/// A fill was rejected; `reason` carries the node's message verbatim.
	/// The remaining schedule continues.
	FillRejected {
		order_hash: B256,
		cycle: u64,
		reason: String,
	},
	/// A consumed authorization nonce was replaced and the fill resubmitted.
	AuthorizationRotated { order_hash: B256, nonce: U256 },
	/// A fresh execution-state snapshot was published.
	StateUpdated { state: ExecutionState },
	/// Every scheduled cycle has been submitted.
	ScheduleCompleted { order_hash: B256 },
	/// An on-chain cancellation was submitted for this order.
	CancellationSubmitted { order_hash: B256, tx_hash: B256 },
}
