//! Execution state tracking.
//!
//! Derives an order's progress from the settler's `remaining` view on
//! every poll tick. When the read is unavailable the tracker falls back to
//! a time-based estimate so callers never see a blank state; the estimate
//! is tagged [`StateSource::TimeEstimated`] and the next successful read
//! supersedes it. The tracker owns no timer; the caller decides when to
//! poll.

use alloy_primitives::{B256, U256};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, warn};
use twap_delivery::ChainViewInterface;
use twap_types::{ExecutionState, FillSchedule, StateSource};

pub struct ExecutionStateTracker {
	order_hash: B256,
	original_amount: U256,
	schedule: FillSchedule,
	chain: Arc<dyn ChainViewInterface>,
	/// Latest snapshot, replaced atomically on every poll so concurrent
	/// readers never observe a partial update.
	snapshot: ArcSwapOption<ExecutionState>,
}

impl ExecutionStateTracker {
	pub fn new(
		order_hash: B256,
		original_amount: U256,
		schedule: FillSchedule,
		chain: Arc<dyn ChainViewInterface>,
	) -> Self {
		Self {
			order_hash,
			original_amount,
			schedule,
			chain,
			snapshot: ArcSwapOption::const_empty(),
		}
	}

	/// The most recent snapshot, if any poll has completed yet. May be up
	/// to one poll interval stale; that is expected and acceptable.
	pub fn latest(&self) -> Option<Arc<ExecutionState>> {
		self.snapshot.load_full()
	}

	/// Recomputes the execution state at `now` and publishes the snapshot.
	pub async fn poll(&self, now: u64) -> Arc<ExecutionState> {
		let state = match self.chain.remaining(self.order_hash).await {
			Ok(remaining) => self.confirmed(remaining, now),
			Err(e) => {
				// Not zero progress: estimate from elapsed time until the
				// read recovers.
				warn!(order_hash = %self.order_hash, error = %e, "Remaining read unavailable, estimating from schedule");
				self.estimated(now)
			}
		};

		debug!(
			order_hash = %self.order_hash,
			filled = %state.filled_amount,
			percent = state.progress_percent,
			source = ?state.source,
			"Execution state updated"
		);

		let state = Arc::new(state);
		self.snapshot.store(Some(state.clone()));
		state
	}

	fn confirmed(&self, remaining: U256, now: u64) -> ExecutionState {
		let remaining = remaining.min(self.original_amount);
		let filled = self.original_amount - remaining;
		self.state_from(filled, now, StateSource::OnChainConfirmed)
	}

	fn estimated(&self, now: u64) -> ExecutionState {
		let cycles = self.cycles_elapsed(now);
		let filled = self
			.schedule
			.chunk_in_amount
			.saturating_mul(U256::from(cycles))
			.min(self.original_amount);
		self.state_from(filled, now, StateSource::TimeEstimated)
	}

	fn state_from(&self, filled: U256, now: u64, source: StateSource) -> ExecutionState {
		let cycles_elapsed = self.cycles_elapsed(now);
		ExecutionState {
			order_hash: self.order_hash,
			filled_amount: filled,
			remaining_amount: self.original_amount - filled,
			progress_percent: percent_of(filled, self.original_amount),
			cycles_elapsed,
			next_fill_due_at: self.schedule.due_at(cycles_elapsed + 1),
			source,
			polled_at: now,
		}
	}

	fn cycles_elapsed(&self, now: u64) -> u64 {
		now.saturating_sub(self.schedule.created_at) / self.schedule.interval_secs
	}
}

/// Integer percent of `part` in `total`, clamped to 0..=100.
fn percent_of(part: U256, total: U256) -> u8 {
	if total.is_zero() {
		return 0;
	}
	let percent = part.saturating_mul(U256::from(100u8)) / total;
	u8::try_from(percent).unwrap_or(100).min(100)
}
