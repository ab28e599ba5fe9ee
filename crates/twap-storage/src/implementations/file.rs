//! File-based storage backend.
//!
//! One file per key under a base directory. Writes go through a temp file
//! and a rename so a crash mid-write never leaves a torn record behind.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Keys become filesystem-safe file names with a `.bin` extension.
	fn sanitize(key: &str) -> String {
		key.replace(['/', ':'], "_")
	}

	fn file_path(&self, key: &str) -> PathBuf {
		self.base_path.join(format!("{}.bin", Self::sanitize(key)))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.file_path(key).exists())
	}

	async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}_", Self::sanitize(namespace));

		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			// An unused store has no directory yet.
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name();
			let Some(name) = name.to_str() else { continue };
			if let Some(id) = name
				.strip_suffix(".bin")
				.and_then(|stem| stem.strip_prefix(&prefix))
			{
				keys.push(format!("{}:{}", namespace, id));
			}
		}

		Ok(keys)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::StorageService;
	use alloy_primitives::{Address, Bytes, B256, U256};
	use twap_schedule::ScheduleParams;
	use twap_types::{OrderRecord, Signature, SignedOrder, TwapOrder};

	fn service(dir: &tempfile::TempDir) -> StorageService {
		StorageService::new(Box::new(FileStorage::new(dir.path().to_path_buf())))
	}

	fn record() -> OrderRecord {
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
			interactions: Bytes::from(vec![0xaa; 244]),
		};
		let schedule = ScheduleParams {
			chunk_amount: U256::from(100u64),
			interval_secs: 3600,
			slippage_percent: 1,
			total_amount: Some(U256::from(1000u64)),
			end_date: None,
			quoted_chunk_output: Some(U256::from(1_000_000u64)),
		}
		.build(1_700_000_000)
		.unwrap();

		let signed = SignedOrder {
			order,
			order_hash: B256::repeat_byte(0x77),
			signature: Signature(vec![0x01; 65].into()),
		};
		let mut record = OrderRecord::new(signed, schedule, None);
		record.fills_submitted = 3;
		record
	}

	#[tokio::test]
	async fn test_order_record_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let storage = service(&dir);
		let record = record();
		let id = format!("{:x}", record.signed.order_hash);

		storage.store("orders", &id, &record).await.unwrap();
		let loaded: OrderRecord = storage.retrieve("orders", &id).await.unwrap();

		assert_eq!(loaded.signed.order_hash, record.signed.order_hash);
		assert_eq!(loaded.schedule, record.schedule);
		assert_eq!(loaded.fills_submitted, 3);
		assert_eq!(loaded.signed.order, record.signed.order);
	}

	#[tokio::test]
	async fn test_missing_record_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let storage = service(&dir);

		let result: Result<OrderRecord, _> = storage.retrieve("orders", "missing").await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_list_ids_only_sees_own_namespace() {
		let dir = tempfile::tempdir().unwrap();
		let storage = service(&dir);
		let record = record();

		storage.store("orders", "aa11", &record).await.unwrap();
		storage.store("orders", "bb22", &record).await.unwrap();
		storage.store("receipts", "cc33", &3u64).await.unwrap();

		let mut ids = storage.list_ids("orders").await.unwrap();
		ids.sort();
		assert_eq!(ids, vec!["aa11".to_string(), "bb22".to_string()]);
	}

	#[tokio::test]
	async fn test_delete_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let storage = service(&dir);

		storage.store("orders", "aa11", &record()).await.unwrap();
		storage.remove("orders", "aa11").await.unwrap();
		storage.remove("orders", "aa11").await.unwrap();
		assert!(!storage.exists("orders", "aa11").await.unwrap());
	}
}
