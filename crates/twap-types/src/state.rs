//! Execution state snapshots.
//!
//! Derived views over on-chain progress, recomputed on every poll tick and
//! published as immutable snapshots. Never cached authoritatively beyond
//! one poll interval.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Confidence level of an execution-state snapshot.
///
/// Time-based estimates exist only to avoid a blank state before the first
/// successful chain read; callers must not conflate the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateSource {
	/// Derived from an on-chain `remaining` reading.
	OnChainConfirmed,
	/// Derived from elapsed time alone; superseded by the next
	/// successful chain read.
	TimeEstimated,
}

/// One snapshot of an order's execution progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
	pub order_hash: B256,
	/// Maker-asset amount filled so far, clamped to the original amount.
	pub filled_amount: U256,
	/// Maker-asset amount still unfilled.
	pub remaining_amount: U256,
	/// Integer percent complete, clamped to 0..=100.
	pub progress_percent: u8,
	/// Whole intervals elapsed since schedule creation.
	pub cycles_elapsed: u64,
	/// Unix timestamp the next fill becomes due.
	pub next_fill_due_at: u64,
	pub source: StateSource,
	/// Unix timestamp this snapshot was computed at.
	pub polled_at: u64,
}
