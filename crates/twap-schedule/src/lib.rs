//! Fill schedule calculation.
//!
//! Pure arithmetic: no clock access and no network. The caller supplies
//! `now`, which becomes the schedule's `created_at` and the reference point
//! for end-date math.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use twap_types::{FillSchedule, StopCondition, SECONDS_PER_DAY};

#[derive(Debug, Error)]
pub enum ScheduleError {
	#[error("Chunk amount must be greater than zero")]
	InvalidChunkAmount,
	#[error("Interval must be greater than zero seconds")]
	InvalidInterval,
	#[error("Slippage tolerance {0}% is outside 0..=100")]
	InvalidSlippage(u8),
	#[error("Total-amount and end-date stop conditions are mutually exclusive")]
	ConflictingStopConditions,
	#[error("Cycle count does not fit in 64 bits")]
	CycleOverflow,
}

/// Inputs to the schedule calculation.
///
/// At most one of `total_amount` / `end_date` may be set; neither set is
/// the valid unbounded configuration. `quoted_chunk_output` is the
/// reference output for one chunk from the external quote collaborator;
/// without it the per-fill minimum is zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleParams {
	pub chunk_amount: U256,
	pub interval_secs: u64,
	/// Integer percent, 0..=100.
	pub slippage_percent: u8,
	pub total_amount: Option<U256>,
	/// Unix timestamp.
	pub end_date: Option<u64>,
	pub quoted_chunk_output: Option<U256>,
}

impl ScheduleParams {
	/// Builds the schedule with `now` as its creation instant.
	///
	/// Input-contract violations are rejected here, synchronously, before
	/// anything downstream (encoding, signing) runs. An end date already
	/// in the past yields an inert zero-cycle schedule, not an error.
	pub fn build(&self, now: u64) -> Result<FillSchedule, ScheduleError> {
		if self.chunk_amount.is_zero() {
			return Err(ScheduleError::InvalidChunkAmount);
		}
		if self.interval_secs == 0 {
			return Err(ScheduleError::InvalidInterval);
		}
		if self.slippage_percent > 100 {
			return Err(ScheduleError::InvalidSlippage(self.slippage_percent));
		}
		if self.total_amount.is_some() && self.end_date.is_some() {
			return Err(ScheduleError::ConflictingStopConditions);
		}

		let min_out_per_fill = match self.quoted_chunk_output {
			Some(quoted) => min_out_after_slippage(quoted, self.slippage_percent),
			None => U256::ZERO,
		};

		let (stop, total_cycles, will_run_forever) = match (self.total_amount, self.end_date) {
			(Some(total), None) => {
				let cycles = cycles_for_total(total, self.chunk_amount)?;
				(StopCondition::TotalAmount(total), cycles, false)
			}
			(None, Some(end)) => {
				// A non-positive remaining duration is an inert
				// schedule, treated as already complete.
				let remaining_secs = end.saturating_sub(now);
				let cycles = remaining_secs / self.interval_secs;
				(StopCondition::EndDate(end), cycles, false)
			}
			(None, None) => (StopCondition::Unbounded, 0, true),
			(Some(_), Some(_)) => unreachable!("rejected above"),
		};

		let (projected_completion, estimated_days) = if will_run_forever {
			(None, 0)
		} else {
			let run_secs = total_cycles.saturating_mul(self.interval_secs);
			let days = run_secs.div_ceil(SECONDS_PER_DAY);
			(Some(now + run_secs), days)
		};

		Ok(FillSchedule {
			total_cycles,
			interval_secs: self.interval_secs,
			chunk_in_amount: self.chunk_amount,
			min_out_per_fill,
			stop,
			created_at: now,
			will_run_forever,
			projected_completion,
			estimated_days,
		})
	}
}

/// `quoted * (100 - slippage) / 100`, truncated toward zero.
///
/// Truncation (never rounding up) guarantees the minimum-output floor is
/// never silently loosened.
pub fn min_out_after_slippage(quoted: U256, slippage_percent: u8) -> U256 {
	let keep = U256::from(100u8 - slippage_percent);
	quoted * keep / U256::from(100u8)
}

/// `ceil(total / chunk)` as a cycle count.
fn cycles_for_total(total: U256, chunk: U256) -> Result<u64, ScheduleError> {
	let quotient = total / chunk;
	let exact = (total % chunk).is_zero();
	let cycles = u64::try_from(quotient).map_err(|_| ScheduleError::CycleOverflow)?;
	if exact {
		Ok(cycles)
	} else {
		cycles.checked_add(1).ok_or(ScheduleError::CycleOverflow)
	}
}
