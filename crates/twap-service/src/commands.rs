//! Command implementations and service wiring.

use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use twap_account::{AccountService, LocalWallet};
use twap_config::Config;
use twap_core::{EngineBuilder, EngineSettings, TwapEngine};
use twap_delivery::{AlloyChain, ChainViewInterface, DeliveryService};
use twap_order::{
	encode_interactions, first_free_nonce, signer::authorization_deadline, OrderParams,
	OrderSigner, PostFillDeposit, SigningDomain,
};
use twap_schedule::ScheduleParams;
use twap_storage::{FileStorage, StorageService};
use twap_types::{OrderRecord, StateSource};

/// Everything a command needs, wired once from configuration.
struct Services {
	engine: Arc<TwapEngine>,
	chain: Arc<AlloyChain>,
	signer: Arc<OrderSigner>,
}

fn build_services(config: &Config) -> Result<Services> {
	let wallet =
		LocalWallet::new(&config.account.private_key).context("Failed to load signing key")?;
	let provider_key = wallet.signer();
	let account = Arc::new(AccountService::new(Box::new(wallet)));

	let chain = Arc::new(
		AlloyChain::new(
			&config.chain.rpc_url,
			config.chain.chain_id,
			config.chain.settler_address,
			config.chain.authorizer_address,
			provider_key,
		)
		.context("Failed to connect chain backend")?,
	);

	let signer = Arc::new(OrderSigner::new(
		SigningDomain {
			chain_id: config.chain.chain_id,
			settler: config.chain.settler_address,
			authorizer: config.chain.authorizer_address,
		},
		Some(account),
	));

	let storage = Arc::new(StorageService::new(Box::new(FileStorage::new(
		PathBuf::from(&config.storage.path),
	))));

	let engine = EngineBuilder::new()
		.with_settings(EngineSettings {
			chain_id: config.chain.chain_id,
			settler: config.chain.settler_address,
			poll_interval_secs: config.engine.poll_interval_secs,
			authorization_window_secs: config.engine.authorization_window_secs,
		})
		.with_storage(storage)
		.with_delivery(Arc::new(DeliveryService::new(Box::new(chain.clone()))))
		.with_chain_view(chain.clone())
		.with_signer(signer.clone())
		.build()
		.context("Failed to build engine")?;

	Ok(Services {
		engine: Arc::new(engine),
		chain,
		signer,
	})
}

pub async fn start(config: Config) -> Result<()> {
	let services = build_services(&config)?;
	info!(name = %config.engine.name, "Starting TWAP engine");
	services.engine.run().await.context("Engine stopped")?;
	Ok(())
}

#[derive(Args)]
pub struct CreateArgs {
	/// Token to sell
	#[arg(long)]
	pub maker_asset: Address,
	/// Token to buy
	#[arg(long)]
	pub taker_asset: Address,
	/// Maker-asset amount per fill
	#[arg(long)]
	pub chunk_amount: U256,
	/// Seconds between fills
	#[arg(long)]
	pub interval_secs: u64,
	/// Slippage tolerance percent; defaults from configuration
	#[arg(long)]
	pub slippage_percent: Option<u8>,
	/// Stop after this total maker-asset amount (exclusive with --end-date)
	#[arg(long)]
	pub total_amount: Option<U256>,
	/// Stop at this unix timestamp (exclusive with --total-amount)
	#[arg(long)]
	pub end_date: Option<u64>,
	/// Reference quote for one chunk's output, used for the per-fill minimum
	#[arg(long)]
	pub quoted_chunk_output: Option<U256>,
	/// Cap for an unbounded order; derived from the schedule otherwise
	#[arg(long)]
	pub making_amount: Option<U256>,
	/// Total taker-asset expectation; derived from the quote otherwise
	#[arg(long)]
	pub taking_amount: Option<U256>,
	/// Recipient of the taker asset; defaults to the maker
	#[arg(long)]
	pub receiver: Option<Address>,
	/// Restrict fills to this taker; public order otherwise
	#[arg(long)]
	pub allowed_sender: Option<Address>,
	/// Sign a gasless transfer authorization alongside the order
	#[arg(long, default_value_t = false)]
	pub gasless: bool,
	/// Deposit received tokens for this recipient after each fill
	#[arg(long)]
	pub post_fill_recipient: Option<Address>,
	/// Pool receiving the post-fill deposit
	#[arg(long)]
	pub post_fill_pool: Option<Address>,
}

pub async fn create(config: Config, args: CreateArgs) -> Result<()> {
	let services = build_services(&config)?;
	let now = unix_now();

	let schedule = ScheduleParams {
		chunk_amount: args.chunk_amount,
		interval_secs: args.interval_secs,
		slippage_percent: args
			.slippage_percent
			.unwrap_or(config.schedule.default_slippage_percent),
		total_amount: args.total_amount,
		end_date: args.end_date,
		quoted_chunk_output: args.quoted_chunk_output,
	}
	.build(now)
	.context("Invalid schedule parameters")?;

	if schedule.is_inert() {
		info!("End date has already passed; the schedule has nothing to execute");
		return Ok(());
	}

	let making_amount = match args.making_amount {
		Some(amount) => amount,
		None if schedule.will_run_forever => {
			bail!("--making-amount is required for an unbounded schedule")
		}
		None => match args.total_amount {
			Some(total) => total,
			None => args.chunk_amount * U256::from(schedule.total_cycles),
		},
	};
	let taking_amount = args
		.taking_amount
		.unwrap_or(schedule.min_out_per_fill * U256::from(schedule.total_cycles));

	let post_fill = match (args.post_fill_recipient, args.post_fill_pool) {
		(Some(recipient), Some(pool)) => Some(PostFillDeposit { recipient, pool }),
		(None, None) => None,
		_ => bail!("--post-fill-recipient and --post-fill-pool must be supplied together"),
	};

	let interactions = encode_interactions(
		config.chain.hook_address,
		Some(&schedule),
		post_fill.as_ref(),
	);

	let maker = services.signer.account_address()?;

	// Gasless setup happens before the user-visible signing step so any
	// failure aborts before a signature is requested.
	let authorization = if args.gasless {
		let bitmap = services
			.chain
			.nonce_bitmap(maker, U256::ZERO)
			.await
			.context("Failed to read authorization nonce bitmap")?;
		let nonce = first_free_nonce(bitmap)?;
		let deadline = authorization_deadline(
			args.end_date,
			now,
			config.engine.authorization_window_secs,
		);

		Some(
			services
				.signer
				.sign_authorization(
					args.maker_asset,
					config.chain.settler_address,
					making_amount,
					nonce,
					deadline,
					now,
				)
				.await
				.context("Failed to sign transfer authorization")?,
		)
	} else {
		None
	};

	let order = OrderParams {
		maker,
		maker_asset: args.maker_asset,
		taker_asset: args.taker_asset,
		making_amount,
		taking_amount,
		receiver: args.receiver,
		allowed_sender: args.allowed_sender,
		salt: None,
		end_date: args.end_date,
		permit: Bytes::new(),
		interactions,
	}
	.build()
	.context("Failed to build order")?;

	let signed = services
		.signer
		.sign_order(order)
		.await
		.context("Failed to sign order")?;
	let order_hash = signed.order_hash;

	let record = OrderRecord::new(signed, schedule.clone(), authorization);
	services.engine.track_order(record).await?;

	println!("order_hash: {:#x}", order_hash);
	println!("total_cycles: {}", cycles_display(&schedule));
	println!("interval_secs: {}", schedule.interval_secs);
	println!("chunk_in_amount: {}", schedule.chunk_in_amount);
	println!("min_out_per_fill: {}", schedule.min_out_per_fill);
	match schedule.projected_completion {
		Some(at) => println!(
			"projected_completion: {} (~{} days)",
			format_unix(at),
			schedule.estimated_days
		),
		None => println!("projected_completion: indefinite"),
	}

	Ok(())
}

pub async fn status(config: Config, order_hash: &str) -> Result<()> {
	let order_hash: B256 = order_hash.parse().context("Invalid order hash")?;
	let services = build_services(&config)?;
	services.engine.resume().await?;

	let state = services.engine.poll_once(order_hash).await?;

	println!("order_hash: {:#x}", state.order_hash);
	println!("filled_amount: {}", state.filled_amount);
	println!("remaining_amount: {}", state.remaining_amount);
	println!("progress_percent: {}", state.progress_percent);
	println!("cycles_elapsed: {}", state.cycles_elapsed);
	println!(
		"next_fill_due_at: {} ({})",
		state.next_fill_due_at,
		format_unix(state.next_fill_due_at)
	);
	println!(
		"source: {}",
		match state.source {
			StateSource::OnChainConfirmed => "on-chain",
			StateSource::TimeEstimated => "time-estimated",
		}
	);

	Ok(())
}

pub async fn cancel(config: Config, order_hash: &str) -> Result<()> {
	let order_hash: B256 = order_hash.parse().context("Invalid order hash")?;
	let services = build_services(&config)?;
	services.engine.resume().await?;

	let tx_hash = services.engine.cancel_order(order_hash).await?;
	println!("cancellation_tx: {:#x}", tx_hash);

	Ok(())
}

fn cycles_display(schedule: &twap_types::FillSchedule) -> String {
	if schedule.will_run_forever {
		"indefinite".to_string()
	} else {
		schedule.total_cycles.to_string()
	}
}

fn format_unix(ts: u64) -> String {
	DateTime::from_timestamp(ts as i64, 0)
		.map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
		.unwrap_or_else(|| ts.to_string())
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
