//! Solidity type definitions for the on-chain contracts.
//!
//! Field order and widths here are the wire format: any change is a
//! breaking change against the deployed settler, hook, and authorizer.

use alloy_sol_types::sol;
use twap_types::TwapOrder;

sol! {
	/// Order record in the exact layout the settler hashes and verifies.
	struct Order {
		uint256 salt;
		address makerAsset;
		address takerAsset;
		address maker;
		address receiver;
		address allowedSender;
		uint256 makingAmount;
		uint256 takingAmount;
		bytes predicate;
		bytes permit;
		bytes interactions;
	}

	/// The order-matching contract.
	interface ITwapSettler {
		function fillOrder(
			Order calldata order,
			bytes calldata signature,
			uint256 makingAmount
		) external returns (uint256 actualMakingAmount);

		function fillOrderWithPermit(
			Order calldata order,
			bytes calldata signature,
			uint256 makingAmount,
			bytes calldata permit,
			bytes calldata permitSignature
		) external returns (uint256 actualMakingAmount);

		function cancelOrder(Order calldata order) external;

		function remaining(bytes32 orderHash) external view returns (uint256 amount);

		function timestampBelow(uint256 time) external view returns (bool);
	}

	/// Fixed-layout record decoded by the TWAP hook contract. All fields
	/// are static ABI words, so the encoded tuple has constant length.
	struct TwapHookData {
		uint64 interval;
		uint64 totalChunks;
		uint256 chunkInAmount;
		uint256 minOutPerChunk;
		bool postFillDeposit;
		address postFillRecipient;
		address postFillPool;
	}

	/// Token/amount pair covered by a transfer authorization.
	struct TokenPermissions {
		address token;
		uint256 amount;
	}

	/// Gasless transfer authorization record (Permit2 wire format).
	struct PermitTransferFrom {
		TokenPermissions permitted;
		address spender;
		uint256 nonce;
		uint256 deadline;
	}

	/// The gasless-authorization contract.
	interface ISignatureAuthorizer {
		function nonceBitmap(address owner, uint256 wordIndex) external view returns (uint256 bitmap);
	}
}

impl From<&TwapOrder> for Order {
	fn from(order: &TwapOrder) -> Self {
		Order {
			salt: order.salt,
			makerAsset: order.maker_asset,
			takerAsset: order.taker_asset,
			maker: order.maker,
			receiver: order.receiver,
			allowedSender: order.allowed_sender,
			makingAmount: order.making_amount,
			takingAmount: order.taking_amount,
			predicate: order.predicate.clone(),
			permit: order.permit.clone(),
			interactions: order.interactions.clone(),
		}
	}
}
