//! EIP-712 hashing and signing.
//!
//! Two independent signatures leave this module: one over the order record
//! under the settler's domain, one over a transfer authorization under the
//! authorizer's domain. Each is bound to exactly its structured-data hash;
//! mutating any signed field invalidates the signature.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;
use twap_account::AccountService;
use twap_types::{Authorization, SignedOrder, TwapOrder};

use crate::{
	abi::{self, PermitTransferFrom, TokenPermissions},
	OrderError,
};

/// Domain name/version the settler verifies order signatures under.
const ORDER_DOMAIN_NAME: &str = "TWAP Settler";
const ORDER_DOMAIN_VERSION: &str = "1";

/// The authorizer contract uses the canonical Permit2 domain, which
/// carries no version field.
const AUTHORIZATION_DOMAIN_NAME: &str = "Permit2";

/// The structured-data domains used for signing.
///
/// Exposed so callers can detect a chain/contract mismatch between order
/// construction and later fill submission before anything goes on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningDomain {
	pub chain_id: u64,
	pub settler: Address,
	pub authorizer: Address,
}

impl SigningDomain {
	pub fn order_domain(&self) -> Eip712Domain {
		Eip712Domain::new(
			Some(Cow::Borrowed(ORDER_DOMAIN_NAME)),
			Some(Cow::Borrowed(ORDER_DOMAIN_VERSION)),
			Some(U256::from(self.chain_id)),
			Some(self.settler),
			None,
		)
	}

	pub fn authorization_domain(&self) -> Eip712Domain {
		Eip712Domain::new(
			Some(Cow::Borrowed(AUTHORIZATION_DOMAIN_NAME)),
			None,
			Some(U256::from(self.chain_id)),
			Some(self.authorizer),
			None,
		)
	}
}

/// Builds order hashes and produces the maker's signatures.
pub struct OrderSigner {
	domain: SigningDomain,
	account: Option<Arc<AccountService>>,
}

impl OrderSigner {
	pub fn new(domain: SigningDomain, account: Option<Arc<AccountService>>) -> Self {
		Self { domain, account }
	}

	pub fn domain(&self) -> &SigningDomain {
		&self.domain
	}

	/// Address of the configured signing account.
	pub fn account_address(&self) -> Result<Address, OrderError> {
		self.account
			.as_ref()
			.map(|account| account.address())
			.ok_or(OrderError::MissingSigner)
	}

	/// The EIP-712 hash identifying an order under this signer's domain.
	pub fn order_hash(&self, order: &TwapOrder) -> B256 {
		abi::Order::from(order).eip712_signing_hash(&self.domain.order_domain())
	}

	/// Signs an order, binding the signature to its structured-data hash.
	///
	/// A missing signing account rejects before any hash is constructed,
	/// so no partially signed artifact can exist.
	pub async fn sign_order(&self, order: TwapOrder) -> Result<SignedOrder, OrderError> {
		let account = self.account.as_ref().ok_or(OrderError::MissingSigner)?;

		let order_hash = self.order_hash(&order);
		let signature = account.sign_hash(&order_hash).await?;
		debug!(order_hash = %order_hash, maker = %order.maker, "Signed order");

		Ok(SignedOrder {
			order,
			order_hash,
			signature,
		})
	}

	/// Signs a gasless transfer authorization, independent of any order
	/// signature.
	///
	/// `deadline` must be in the future at signing time; callers bound it
	/// by the lesser of the order's end date and a short fixed window.
	pub async fn sign_authorization(
		&self,
		token: Address,
		spender: Address,
		amount: U256,
		nonce: u16,
		deadline: u64,
		now: u64,
	) -> Result<Authorization, OrderError> {
		if deadline <= now {
			return Err(OrderError::DeadlineInPast { deadline, now });
		}
		let account = self.account.as_ref().ok_or(OrderError::MissingSigner)?;

		let nonce = U256::from(nonce);
		let permit = PermitTransferFrom {
			permitted: TokenPermissions { token, amount },
			spender,
			nonce,
			deadline: U256::from(deadline),
		};

		let hash = permit.eip712_signing_hash(&self.domain.authorization_domain());
		let signature = account.sign_hash(&hash).await?;
		debug!(%token, %spender, %nonce, deadline, "Signed transfer authorization");

		Ok(Authorization {
			token,
			spender,
			amount,
			nonce,
			deadline,
			signature,
		})
	}
}

/// The deadline policy for transfer authorizations: the lesser of the
/// order's end date (when bounded) and `now + window_secs`, so a
/// valid-but-unused authorization's exposure stays bounded.
pub fn authorization_deadline(end_date: Option<u64>, now: u64, window_secs: u64) -> u64 {
	let window_end = now.saturating_add(window_secs);
	match end_date {
		Some(end) => end.min(window_end),
		None => window_end,
	}
}
