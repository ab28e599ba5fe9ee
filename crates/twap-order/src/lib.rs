//! Order construction, encoding, and signing.
//!
//! Everything that produces the byte-exact artifacts the on-chain contracts
//! parse and trust: the interactions blob, the authorization nonce, the
//! EIP-712 order hash and signatures, and the fill/cancel calldata.

use thiserror::Error;

pub mod abi;
pub mod builder;
pub mod interactions;
pub mod nonce;
pub mod signer;
pub mod transactions;

pub use builder::OrderParams;
pub use interactions::{decode_interactions, encode_interactions, PostFillDeposit, INTERACTIONS_LEN};
pub use nonce::{first_free_nonce, NonceError};
pub use signer::{OrderSigner, SigningDomain};
pub use transactions::{cancel_transaction, fill_transaction};

#[derive(Debug, Error)]
pub enum OrderError {
	#[error("No signing account configured")]
	MissingSigner,
	#[error("Signing failed: {0}")]
	Signing(String),
	#[error("Invalid order parameters: {0}")]
	InvalidParams(String),
	#[error("Authorization deadline {deadline} is not in the future (now {now})")]
	DeadlineInPast { deadline: u64, now: u64 },
	#[error("Malformed interactions blob: {0}")]
	MalformedInteractions(String),
}

impl From<twap_account::AccountError> for OrderError {
	fn from(err: twap_account::AccountError) -> Self {
		match err {
			twap_account::AccountError::MissingSigner => OrderError::MissingSigner,
			other => OrderError::Signing(other.to_string()),
		}
	}
}
