//! Order construction.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use std::time::{SystemTime, UNIX_EPOCH};
use twap_types::TwapOrder;

use crate::{abi::ITwapSettler, OrderError};

/// Inputs for constructing an order record.
///
/// `receiver` defaults to the maker and `allowed_sender` to the zero
/// address (the public-order sentinel: any taker may fill). The salt
/// defaults to the current unix time in milliseconds; supply one
/// explicitly for deterministic construction.
#[derive(Debug, Clone)]
pub struct OrderParams {
	pub maker: Address,
	pub maker_asset: Address,
	pub taker_asset: Address,
	pub making_amount: U256,
	pub taking_amount: U256,
	pub receiver: Option<Address>,
	pub allowed_sender: Option<Address>,
	pub salt: Option<U256>,
	/// Expiry enforced on-chain through a `timestampBelow` predicate.
	pub end_date: Option<u64>,
	/// Gasless-authorization payload, empty when not gasless.
	pub permit: Bytes,
	/// Hook-address-prefixed schedule blob.
	pub interactions: Bytes,
}

impl OrderParams {
	/// Builds the immutable order record.
	///
	/// Rejects synchronously on contract violations; nothing here touches
	/// the network.
	pub fn build(self) -> Result<TwapOrder, OrderError> {
		if self.making_amount.is_zero() {
			return Err(OrderError::InvalidParams(
				"making amount must be greater than zero".to_string(),
			));
		}
		if self.maker_asset == self.taker_asset {
			return Err(OrderError::InvalidParams(
				"maker and taker asset must differ".to_string(),
			));
		}

		let predicate: Bytes = match self.end_date {
			Some(end) => ITwapSettler::timestampBelowCall {
				time: U256::from(end),
			}
			.abi_encode()
			.into(),
			None => Bytes::new(),
		};

		Ok(TwapOrder {
			salt: self.salt.unwrap_or_else(time_salt),
			maker_asset: self.maker_asset,
			taker_asset: self.taker_asset,
			maker: self.maker,
			receiver: self.receiver.unwrap_or(self.maker),
			allowed_sender: self.allowed_sender.unwrap_or(Address::ZERO),
			making_amount: self.making_amount,
			taking_amount: self.taking_amount,
			predicate,
			permit: self.permit,
			interactions: self.interactions,
		})
	}
}

fn time_salt() -> U256 {
	let millis = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis();
	U256::from(millis)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn params() -> OrderParams {
		OrderParams {
			maker: Address::repeat_byte(0x11),
			maker_asset: Address::repeat_byte(0x22),
			taker_asset: Address::repeat_byte(0x33),
			making_amount: U256::from(1000u64),
			taking_amount: U256::from(2000u64),
			receiver: None,
			allowed_sender: None,
			salt: Some(U256::from(7u64)),
			end_date: None,
			permit: Bytes::new(),
			interactions: Bytes::new(),
		}
	}

	#[test]
	fn test_defaults_receiver_and_public_sentinel() {
		let order = params().build().unwrap();
		assert_eq!(order.receiver, order.maker);
		assert_eq!(order.allowed_sender, Address::ZERO);
		assert!(order.predicate.is_empty());
	}

	#[test]
	fn test_end_date_becomes_predicate() {
		let mut p = params();
		p.end_date = Some(1_800_000_000);
		let order = p.build().unwrap();
		// Selector plus one word.
		assert_eq!(order.predicate.len(), 4 + 32);
		assert_eq!(
			&order.predicate[..4],
			&ITwapSettler::timestampBelowCall::SELECTOR[..]
		);
	}

	#[test]
	fn test_zero_making_amount_rejected() {
		let mut p = params();
		p.making_amount = U256::ZERO;
		assert!(matches!(p.build(), Err(OrderError::InvalidParams(_))));
	}

	#[test]
	fn test_same_asset_pair_rejected() {
		let mut p = params();
		p.taker_asset = p.maker_asset;
		assert!(matches!(p.build(), Err(OrderError::InvalidParams(_))));
	}
}
