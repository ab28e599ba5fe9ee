use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twap_config::ConfigLoader;

mod commands;

#[derive(Parser)]
#[command(name = "twap-engine")]
#[command(about = "TWAP order engine", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "TWAP_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Run the fill scheduler until interrupted
	Start,
	/// Validate the configuration file
	Validate,
	/// Build, sign, and begin tracking a new order
	Create(commands::CreateArgs),
	/// Poll one order and print its execution state
	Status {
		#[arg(long)]
		order_hash: String,
	},
	/// Submit the on-chain cancellation for an order
	Cancel {
		#[arg(long)]
		order_hash: String,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level);

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	match cli.command {
		Some(Commands::Start) | None => commands::start(config).await,
		Some(Commands::Validate) => {
			info!("Configuration is valid");
			info!(
				chain_id = config.chain.chain_id,
				settler = %config.chain.settler_address,
				hook = %config.chain.hook_address,
				authorizer = %config.chain.authorizer_address,
				"Chain"
			);
			info!(
				poll_interval_secs = config.engine.poll_interval_secs,
				storage_path = %config.storage.path,
				"Engine"
			);
			Ok(())
		}
		Some(Commands::Create(args)) => commands::create(config, args).await,
		Some(Commands::Status { order_hash }) => commands::status(config, &order_hash).await,
		Some(Commands::Cancel { order_hash }) => commands::cancel(config, &order_hash).await,
	}
}

fn setup_tracing(log_level: &str) {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();
}
