//! Local private-key wallet.
//!
//! Holds a secp256k1 key in memory and signs digests with it. Suitable for
//! a maker running the engine against their own key; hardware or remote
//! signers would be additional implementations of [`AccountInterface`].

use crate::{AccountError, AccountInterface};
use alloy_primitives::{Address, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use twap_types::Signature;

pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex-encoded private key, with or without a
	/// `0x` prefix.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let stripped = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
		if stripped.len() != 64 {
			return Err(AccountError::InvalidKey(
				"private key must be 64 hex characters (32 bytes)".to_string(),
			));
		}
		if hex::decode(stripped).is_err() {
			return Err(AccountError::InvalidKey(
				"private key must be valid hexadecimal".to_string(),
			));
		}

		let signer = stripped
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

		Ok(Self { signer })
	}

	/// Exposes the underlying signer for provider wallet construction.
	pub fn signer(&self) -> PrivateKeySigner {
		self.signer.clone()
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		let signature = self
			.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		Ok(signature.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// A throwaway test key, never funded.
	const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	#[test]
	fn test_rejects_malformed_keys() {
		assert!(LocalWallet::new("0x1234").is_err());
		assert!(LocalWallet::new(&"zz".repeat(32)).is_err());
	}

	#[tokio::test]
	async fn test_signs_a_digest() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		let digest = B256::repeat_byte(0x42);
		let signature = wallet.sign_hash(&digest).await.unwrap();
		assert_eq!(signature.as_bytes().len(), 65);

		// Same digest, same key, same signature bytes.
		let again = wallet.sign_hash(&digest).await.unwrap();
		assert_eq!(signature, again);
	}
}
