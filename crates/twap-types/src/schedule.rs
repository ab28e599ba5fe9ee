//! Fill schedule types.
//!
//! A schedule is derived off-chain and never persisted on-chain; the
//! on-chain hook only sees its encoded form inside the order's
//! interactions blob.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Seconds in a day, used for completion projections.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// What stops the schedule. Exactly one condition is active at a time;
/// `Unbounded` is the valid "runs forever" configuration, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
	/// Stop once this total making amount has been spent.
	TotalAmount(U256),
	/// Stop at this unix timestamp.
	EndDate(u64),
	/// No cap; the order runs until cancelled.
	Unbounded,
}

/// The derived fill schedule for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillSchedule {
	/// Number of fill cycles. Zero for an already-elapsed end date
	/// (inert schedule) and for the unbounded case.
	pub total_cycles: u64,
	/// Seconds between consecutive fills.
	pub interval_secs: u64,
	/// Maker-asset amount per fill.
	pub chunk_in_amount: U256,
	/// Slippage-adjusted minimum taker-asset amount per fill.
	pub min_out_per_fill: U256,
	pub stop: StopCondition,
	/// Unix timestamp the schedule was computed at; cycle k is due at
	/// `created_at + k * interval_secs`.
	pub created_at: u64,
	/// True only for `StopCondition::Unbounded`.
	pub will_run_forever: bool,
	/// Unix timestamp of the projected last fill, when bounded.
	pub projected_completion: Option<u64>,
	/// Whole days until completion, rounded up. Zero when unbounded.
	pub estimated_days: u64,
}

impl FillSchedule {
	/// Due time of the given 1-based cycle.
	pub fn due_at(&self, cycle: u64) -> u64 {
		self.created_at
			.saturating_add(cycle.saturating_mul(self.interval_secs))
	}

	/// An inert schedule has nothing to execute (end date already past).
	pub fn is_inert(&self) -> bool {
		!self.will_run_forever && self.total_cycles == 0
	}
}
