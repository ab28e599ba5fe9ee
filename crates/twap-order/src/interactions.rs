//! Interactions blob encoding.
//!
//! The blob is the hook contract's 20-byte address followed by the ABI
//! encoding of [`abi::TwapHookData`]. The contract-side decoder requires
//! constant total length, so omitted optional sections are zero-filled,
//! never dropped.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};
use twap_types::FillSchedule;

use crate::{abi::TwapHookData, OrderError};

/// 20-byte hook address + seven static ABI words.
pub const INTERACTIONS_LEN: usize = 20 + 7 * 32;

/// Post-fill deposit of the received taker asset into a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFillDeposit {
	pub recipient: Address,
	pub pool: Address,
}

/// Encodes the schedule (and optional post-fill deposit) into the blob the
/// hook decodes.
///
/// Pure and total: identical inputs produce byte-identical output, which
/// matters because the blob is hashed into the signed order. With no
/// schedule the record degenerates to a single unconstrained chunk with
/// zero minimum output, an immediate one-shot fill.
pub fn encode_interactions(
	hook: Address,
	schedule: Option<&FillSchedule>,
	post_fill: Option<&PostFillDeposit>,
) -> Bytes {
	let data = match schedule {
		Some(schedule) => TwapHookData {
			interval: schedule.interval_secs,
			totalChunks: schedule.total_cycles,
			chunkInAmount: schedule.chunk_in_amount,
			minOutPerChunk: schedule.min_out_per_fill,
			postFillDeposit: post_fill.is_some(),
			postFillRecipient: post_fill.map(|p| p.recipient).unwrap_or(Address::ZERO),
			postFillPool: post_fill.map(|p| p.pool).unwrap_or(Address::ZERO),
		},
		None => TwapHookData {
			interval: 0,
			totalChunks: 1,
			chunkInAmount: alloy_primitives::U256::ZERO,
			minOutPerChunk: alloy_primitives::U256::ZERO,
			postFillDeposit: post_fill.is_some(),
			postFillRecipient: post_fill.map(|p| p.recipient).unwrap_or(Address::ZERO),
			postFillPool: post_fill.map(|p| p.pool).unwrap_or(Address::ZERO),
		},
	};

	let mut blob = Vec::with_capacity(INTERACTIONS_LEN);
	blob.extend_from_slice(hook.as_slice());
	blob.extend_from_slice(&data.abi_encode());
	blob.into()
}

/// Splits a blob back into its hook address and hook record.
///
/// Used by tests and by pre-submission verification; the authoritative
/// decoder is the hook contract itself.
pub fn decode_interactions(blob: &[u8]) -> Result<(Address, TwapHookData), OrderError> {
	if blob.len() != INTERACTIONS_LEN {
		return Err(OrderError::MalformedInteractions(format!(
			"expected {} bytes, got {}",
			INTERACTIONS_LEN,
			blob.len()
		)));
	}

	let hook = Address::from_slice(&blob[..20]);
	let data = TwapHookData::abi_decode(&blob[20..], true)
		.map_err(|e| OrderError::MalformedInteractions(e.to_string()))?;

	Ok((hook, data))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U256;
	use twap_schedule::ScheduleParams;

	fn schedule() -> FillSchedule {
		ScheduleParams {
			chunk_amount: U256::from(100u64),
			interval_secs: 3600,
			slippage_percent: 1,
			total_amount: Some(U256::from(1000u64)),
			end_date: None,
			quoted_chunk_output: Some(U256::from(1_000_000u64)),
		}
		.build(1_700_000_000)
		.unwrap()
	}

	fn hook() -> Address {
		Address::repeat_byte(0xaa)
	}

	#[test]
	fn test_encoding_is_deterministic_and_fixed_length() {
		let s = schedule();
		let a = encode_interactions(hook(), Some(&s), None);
		let b = encode_interactions(hook(), Some(&s), None);
		assert_eq!(a, b);
		assert_eq!(a.len(), INTERACTIONS_LEN);
	}

	#[test]
	fn test_round_trip_with_zero_filled_defaults() {
		let s = schedule();
		let blob = encode_interactions(hook(), Some(&s), None);
		let (decoded_hook, data) = decode_interactions(&blob).unwrap();

		assert_eq!(decoded_hook, hook());
		assert_eq!(data.interval, 3600);
		assert_eq!(data.totalChunks, 10);
		assert_eq!(data.chunkInAmount, U256::from(100u64));
		assert_eq!(data.minOutPerChunk, U256::from(990_000u64));
		assert!(!data.postFillDeposit);
		assert_eq!(data.postFillRecipient, Address::ZERO);
		assert_eq!(data.postFillPool, Address::ZERO);
	}

	#[test]
	fn test_round_trip_with_post_fill_deposit() {
		let s = schedule();
		let deposit = PostFillDeposit {
			recipient: Address::repeat_byte(0x01),
			pool: Address::repeat_byte(0x02),
		};
		let blob = encode_interactions(hook(), Some(&s), Some(&deposit));
		let (_, data) = decode_interactions(&blob).unwrap();

		assert!(data.postFillDeposit);
		assert_eq!(data.postFillRecipient, deposit.recipient);
		assert_eq!(data.postFillPool, deposit.pool);
	}

	#[test]
	fn test_missing_schedule_defaults_to_one_shot() {
		let blob = encode_interactions(hook(), None, None);
		assert_eq!(blob.len(), INTERACTIONS_LEN);

		let (_, data) = decode_interactions(&blob).unwrap();
		assert_eq!(data.totalChunks, 1);
		assert_eq!(data.interval, 0);
		assert_eq!(data.minOutPerChunk, U256::ZERO);
	}

	#[test]
	fn test_truncated_blob_is_rejected() {
		let blob = encode_interactions(hook(), None, None);
		assert!(decode_interactions(&blob[..blob.len() - 1]).is_err());
	}
}
