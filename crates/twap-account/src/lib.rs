//! Signing-key abstraction for the TWAP engine.
//!
//! The order signer only ever needs two capabilities from a key: its
//! address and a signature over a 32-byte structured-data hash. Everything
//! EIP-712-specific stays out of this crate.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use thiserror::Error;
use twap_types::Signature;

pub mod implementations {
	pub mod local;
}

pub use implementations::local::LocalWallet;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("No signing account configured")]
	MissingSigner,
}

/// Interface to a signing key.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	fn address(&self) -> Address;
	/// Signs a prepared 32-byte digest (an EIP-712 signing hash).
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;
}

/// Service wrapper over the configured account provider.
pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub fn address(&self) -> Address {
		self.provider.address()
	}

	pub async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.provider.sign_hash(hash).await
	}
}
