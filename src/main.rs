use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swap_cycler::{app, config};

#[derive(Parser, Debug)]
#[command(version, about = "Repeated buy/sell swap cycles on Solana through Raydium and Jupiter")]
struct Args {
    /// Path to config file (optional)
    #[arg(long)]
    config: Option<String>,

    /// RPC endpoint URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Path to keypair file, used when SECRET_KEY is not set
    #[arg(long)]
    keypair: Option<String>,

    /// Amount of base token spent per buy
    #[arg(long)]
    amount_in: Option<f64>,

    /// How long to keep cycling, in minutes
    #[arg(long)]
    duration_minutes: Option<u64>,

    /// Priority fee budget per transaction in SOL
    #[arg(long)]
    priority_fee_sol: Option<f64>,

    /// Only simulate transactions without executing
    #[arg(long)]
    simulate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    // Priority: CLI args > Config file > Defaults
    let base_config = match &args.config {
        Some(config_path) => config::Config::from_file(config_path)?,
        None => config::Config::default(),
    };
    let mut app_cfg = app::AppCfg::from_config(base_config, args.simulate_only)?;

    if let Some(rpc_url) = args.rpc_url {
        app_cfg.rpc_url = rpc_url;
    }
    if let Some(keypair) = args.keypair {
        app_cfg.keypair_path = Some(keypair);
    }
    if let Some(amount_in) = args.amount_in {
        app_cfg.amount_in = amount_in;
    }
    if let Some(duration_minutes) = args.duration_minutes {
        app_cfg.duration_minutes = duration_minutes;
    }
    if let Some(priority_fee_sol) = args.priority_fee_sol {
        app_cfg.priority_fee_sol = priority_fee_sol;
    }

    let summary = app::run(app_cfg).await?;
    info!(
        "Finished: {} cycles completed, {} failed",
        summary.cycles_completed, summary.cycles_failed
    );
    Ok(())
}
