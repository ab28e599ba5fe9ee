//! Authorization nonce allocation.
//!
//! Scans the per-owner nonce bitmap (word index 0) fetched from the
//! authorizer contract and picks the first unused bit. The choice is
//! advisory: two allocators reading the same stale snapshot can pick the
//! same bit, and the authorizer contract is the authority that rejects the
//! loser at execution time. Callers retry allocation + submission as a
//! unit on that specific rejection.

use alloy_primitives::U256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NonceError {
	#[error("All 256 authorization nonces in bitmap word 0 are consumed")]
	Exhausted,
}

/// Returns the lowest bit position in `bitmap` whose bit is clear.
///
/// A fully set word is a distinct, reported condition: the caller must
/// escalate to a new bitmap word, never fall back to nonce 0.
pub fn first_free_nonce(bitmap: U256) -> Result<u16, NonceError> {
	for bit in 0..256usize {
		if !bitmap.bit(bit) {
			return Ok(bit as u16);
		}
	}
	Err(NonceError::Exhausted)
}
