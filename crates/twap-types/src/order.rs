//! Order model for the TWAP engine.
//!
//! This module defines the canonical off-chain order record, the signed
//! order wrapper that binds a signature to an order hash, and the persisted
//! record the engine tracks across fills.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{FillSchedule, Signature};

/// The canonical order record consumed by the settler contract.
///
/// Immutable once signed: any mutation of these fields changes the order
/// hash and invalidates the signature bound to it. The `interactions` blob
/// carries the encoded fill schedule for the on-chain hook; `predicate` and
/// `permit` are zero-length when unused, never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapOrder {
	/// Uniqueness salt. Two otherwise identical orders with different
	/// salts hash differently.
	pub salt: U256,
	/// Token the maker is selling.
	pub maker_asset: Address,
	/// Token the maker is buying.
	pub taker_asset: Address,
	/// The order's maker (signer).
	pub maker: Address,
	/// Recipient of the taker asset. Defaults to the maker.
	pub receiver: Address,
	/// Restricted taker, or the zero address for a public order.
	pub allowed_sender: Address,
	/// Total amount of maker asset across all fills.
	pub making_amount: U256,
	/// Total amount of taker asset expected across all fills.
	pub taking_amount: U256,
	/// On-chain validity predicate calldata, empty when unused.
	pub predicate: Bytes,
	/// Gasless-authorization payload, empty when unused.
	pub permit: Bytes,
	/// Hook-address-prefixed schedule blob.
	pub interactions: Bytes,
}

/// An order together with its structured-data hash and maker signature.
///
/// The signature is bound to exactly `order_hash`; the pair is only
/// meaningful for the signing domain (chain id + settler) it was built
/// under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOrder {
	pub order: TwapOrder,
	pub order_hash: B256,
	pub signature: Signature,
}

/// A signed gasless transfer authorization.
///
/// Independent of the order signature. The nonce is a bit position in the
/// authorizer's per-owner bitmap word 0; once the bit flips on-chain the
/// authorization is spent and must never be reissued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
	pub token: Address,
	pub spender: Address,
	pub amount: U256,
	pub nonce: U256,
	/// Unix timestamp after which the authorization is invalid.
	pub deadline: u64,
	pub signature: Signature,
}

/// One submitted fill attempt, kept for per-cycle reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRecord {
	/// 1-based cycle number within the schedule.
	pub cycle: u64,
	pub tx_hash: B256,
	pub submitted_at: u64,
}

/// The persisted view of a tracked order.
///
/// This is what the storage layer round-trips so the engine can resume
/// tracking after a restart: the signed order, the full schedule, the
/// current authorization (if gasless), and the cumulative fill count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
	pub signed: SignedOrder,
	pub schedule: FillSchedule,
	pub authorization: Option<Authorization>,
	/// Number of fills submitted so far. Fills are submitted in
	/// non-decreasing cycle order; a missed cycle delays later ones.
	pub fills_submitted: u64,
	pub created_at: u64,
	pub fill_history: Vec<FillRecord>,
}

impl OrderRecord {
	pub fn new(signed: SignedOrder, schedule: FillSchedule, authorization: Option<Authorization>) -> Self {
		let created_at = schedule.created_at;
		Self {
			signed,
			schedule,
			authorization,
			fills_submitted: 0,
			created_at,
			fill_history: Vec::new(),
		}
	}

	/// Whether every scheduled cycle has been submitted. Unbounded
	/// schedules are never exhausted.
	pub fn schedule_exhausted(&self) -> bool {
		!self.schedule.will_run_forever && self.fills_submitted >= self.schedule.total_cycles
	}
}
