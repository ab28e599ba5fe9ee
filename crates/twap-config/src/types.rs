//! Configuration model.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub engine: EngineConfig,
	pub chain: ChainConfig,
	pub account: AccountConfig,
	#[serde(default)]
	pub schedule: ScheduleConfig,
	#[serde(default)]
	pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
	#[serde(default = "default_name")]
	pub name: String,
	/// Seconds between engine ticks; staleness up to one interval is
	/// expected.
	#[serde(default = "default_poll_interval")]
	pub poll_interval_secs: u64,
	/// Upper bound on transfer-authorization validity.
	#[serde(default = "default_authorization_window")]
	pub authorization_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
	pub chain_id: u64,
	pub rpc_url: String,
	/// The order-matching contract orders are signed against.
	pub settler_address: Address,
	/// The hook contract that decodes the interactions blob.
	pub hook_address: Address,
	/// The gasless-authorization contract.
	pub authorizer_address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
	/// Hex-encoded maker private key, `0x`-prefixed or not.
	pub private_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
	/// Integer percent applied when an order is created without an
	/// explicit tolerance.
	#[serde(default = "default_slippage")]
	pub default_slippage_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
	#[serde(default = "default_storage_path")]
	pub path: String,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			name: default_name(),
			poll_interval_secs: default_poll_interval(),
			authorization_window_secs: default_authorization_window(),
		}
	}
}

impl Default for ScheduleConfig {
	fn default() -> Self {
		Self {
			default_slippage_percent: default_slippage(),
		}
	}
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			path: default_storage_path(),
		}
	}
}

fn default_name() -> String {
	"twap-engine".to_string()
}

fn default_poll_interval() -> u64 {
	30
}

fn default_authorization_window() -> u64 {
	3600
}

fn default_slippage() -> u8 {
	1
}

fn default_storage_path() -> String {
	"./data/orders".to_string()
}
