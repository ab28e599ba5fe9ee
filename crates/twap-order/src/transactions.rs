//! Fill and cancellation calldata generation.
//!
//! Produces ready-to-submit transactions for the settler. Submission
//! itself (and any retry policy) lives with the delivery layer and the
//! engine; nothing here touches the network.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use twap_types::{Authorization, SignedOrder, Transaction, TwapOrder};

use crate::abi::{self, ITwapSettler, PermitTransferFrom, TokenPermissions};

/// ABI-encodes an authorization into the payload the settler forwards to
/// the authorizer contract. The signature travels separately.
pub fn authorization_payload(auth: &Authorization) -> Bytes {
	PermitTransferFrom {
		permitted: TokenPermissions {
			token: auth.token,
			amount: auth.amount,
		},
		spender: auth.spender,
		nonce: auth.nonce,
		deadline: U256::from(auth.deadline),
	}
	.abi_encode()
	.into()
}

/// Builds the transaction for one fill chunk of a signed order.
///
/// With an authorization present the fill routes through the gasless
/// entrypoint, carrying the permit payload and its independent signature.
pub fn fill_transaction(
	signed: &SignedOrder,
	chunk_amount: U256,
	authorization: Option<&Authorization>,
	settler: Address,
	chain_id: u64,
) -> Transaction {
	let order = abi::Order::from(&signed.order);
	let signature: Bytes = signed.signature.as_bytes().to_vec().into();

	let data = match authorization {
		Some(auth) => ITwapSettler::fillOrderWithPermitCall {
			order,
			signature,
			makingAmount: chunk_amount,
			permit: authorization_payload(auth),
			permitSignature: auth.signature.as_bytes().to_vec().into(),
		}
		.abi_encode(),
		None => ITwapSettler::fillOrderCall {
			order,
			signature,
			makingAmount: chunk_amount,
		}
		.abi_encode(),
	};

	Transaction::call(settler, data, chain_id)
}

/// Builds the on-chain cancellation for an order.
///
/// Independent of fill submission and of whether anyone is still polling
/// the order; cancelling invalidates all future fills at the settler.
pub fn cancel_transaction(order: &TwapOrder, settler: Address, chain_id: u64) -> Transaction {
	let data = ITwapSettler::cancelOrderCall {
		order: abi::Order::from(order),
	}
	.abi_encode();

	Transaction::call(settler, data, chain_id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use twap_types::Signature;

	fn signed_order() -> SignedOrder {
		let order = TwapOrder {
			salt: U256::from(1u64),
			maker_asset: Address::repeat_byte(0x22),
			taker_asset: Address::repeat_byte(0x33),
			maker: Address::repeat_byte(0x11),
			receiver: Address::repeat_byte(0x11),
			allowed_sender: Address::ZERO,
			making_amount: U256::from(1000u64),
			taking_amount: U256::from(2000u64),
			predicate: Bytes::new(),
			permit: Bytes::new(),
			interactions: Bytes::new(),
		};
		SignedOrder {
			order,
			order_hash: alloy_primitives::B256::repeat_byte(0x99),
			signature: Signature(vec![0x01; 65].into()),
		}
	}

	fn authorization() -> Authorization {
		Authorization {
			token: Address::repeat_byte(0x22),
			spender: Address::repeat_byte(0x55),
			amount: U256::from(1000u64),
			nonce: U256::from(4u64),
			deadline: 2_000,
			signature: Signature(vec![0x02; 65].into()),
		}
	}

	#[test]
	fn test_plain_fill_uses_fill_order_selector() {
		let tx = fill_transaction(
			&signed_order(),
			U256::from(100u64),
			None,
			Address::repeat_byte(0x55),
			1,
		);
		assert_eq!(&tx.data[..4], &ITwapSettler::fillOrderCall::SELECTOR[..]);
		assert_eq!(tx.to, Address::repeat_byte(0x55));
		assert_eq!(tx.chain_id, 1);
	}

	#[test]
	fn test_gasless_fill_uses_permit_selector() {
		let tx = fill_transaction(
			&signed_order(),
			U256::from(100u64),
			Some(&authorization()),
			Address::repeat_byte(0x55),
			1,
		);
		assert_eq!(
			&tx.data[..4],
			&ITwapSettler::fillOrderWithPermitCall::SELECTOR[..]
		);
	}

	#[test]
	fn test_cancel_uses_cancel_selector() {
		let signed = signed_order();
		let tx = cancel_transaction(&signed.order, Address::repeat_byte(0x55), 1);
		assert_eq!(&tx.data[..4], &ITwapSettler::cancelOrderCall::SELECTOR[..]);
	}

	#[test]
	fn test_authorization_payload_is_fixed_width() {
		// Nested static structs: token, amount, spender, nonce, deadline.
		assert_eq!(authorization_payload(&authorization()).len(), 5 * 32);
	}
}
