//! Configuration loading and validation.
//!
//! TOML file with `${VAR}` environment substitution, `TWAP_`-prefixed
//! overrides, and synchronous validation before anything downstream
//! touches the network.

use alloy_primitives::Address;
use std::env;
use std::path::Path;
use thiserror::Error;

pub mod types;

pub use types::{AccountConfig, ChainConfig, Config, EngineConfig, ScheduleConfig, StorageConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),
	#[error("Parse error: {0}")]
	ParseError(String),
	#[error("Validation error: {0}")]
	ValidationError(String),
	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Loads the engine configuration from a TOML file.
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "TWAP_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self
			.file_path
			.as_ref()
			.ok_or_else(|| ConfigError::FileNotFound("No configuration file specified".to_string()))?;

		let content = tokio::fs::read_to_string(file_path).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				ConfigError::FileNotFound(file_path.clone())
			} else {
				ConfigError::IoError(e)
			}
		})?;

		let substituted = self.substitute_env_vars(&content)?;
		let mut config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		validate(&config)?;

		Ok(config)
	}

	/// Replaces `${VAR_NAME}` occurrences with process environment values.
	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static pattern");
		let mut result = content.to_string();

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];
			let value =
				env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
			result = result.replace(full_match, &value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			config.chain.rpc_url = rpc_url;
		}

		if let Ok(private_key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			config.account.private_key = private_key;
		}

		if let Ok(interval) = env::var(format!("{}POLL_INTERVAL_SECS", self.env_prefix)) {
			config.engine.poll_interval_secs = interval.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll interval override: {}", e))
			})?;
		}

		Ok(())
	}
}

/// Rejects contract violations before any network call is made.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
	if config.engine.poll_interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"poll_interval_secs must be greater than zero".to_string(),
		));
	}
	if config.engine.authorization_window_secs == 0 {
		return Err(ConfigError::ValidationError(
			"authorization_window_secs must be greater than zero".to_string(),
		));
	}
	if config.schedule.default_slippage_percent > 100 {
		return Err(ConfigError::ValidationError(
			"default_slippage_percent must be within 0..=100".to_string(),
		));
	}
	if config.chain.chain_id == 0 {
		return Err(ConfigError::ValidationError(
			"chain_id must be greater than zero".to_string(),
		));
	}
	if !config.chain.rpc_url.starts_with("http://") && !config.chain.rpc_url.starts_with("https://")
	{
		return Err(ConfigError::ValidationError(
			"rpc_url must start with http:// or https://".to_string(),
		));
	}

	for (name, address) in [
		("settler_address", config.chain.settler_address),
		("hook_address", config.chain.hook_address),
		("authorizer_address", config.chain.authorizer_address),
	] {
		if address == Address::ZERO {
			return Err(ConfigError::ValidationError(format!(
				"{} must not be the zero address",
				name
			)));
		}
	}

	let key = config
		.account
		.private_key
		.strip_prefix("0x")
		.unwrap_or(&config.account.private_key);
	if key.len() != 64 || hex::decode(key).is_err() {
		return Err(ConfigError::ValidationError(
			"private_key must be 64 hex characters (32 bytes)".to_string(),
		));
	}

	Ok(())
}
