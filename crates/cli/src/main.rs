use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use zero_dte_agent::{StrategyController, StrategyService};
use zero_dte_core::clock::SystemClock;
use zero_dte_core::config::{AppConfig, BrokerConfig};
use zero_dte_core::ConfigLoader;
use zero_dte_data::repositories::{
    GexSnapshotRepository, OrderRepository, PositionRepository, QuoteRepository,
};
use zero_dte_data::{
    DatabaseClient, GexSnapshotStore, InMemoryStore, OrderStore, PositionStore, QuoteStore,
};
use zero_dte_gex::GexService;
use zero_dte_schwab::{BrokerGateway, PaperBroker, RetryingBroker, SchwabClient};

#[derive(Parser)]
#[command(name = "zero-dte")]
#[command(about = "Zero-DTE iron condor agent and GEX capture", long_about = None)]
struct Cli {
    /// Config profile, merged over config/Config.toml as Config.<profile>.toml
    #[arg(short, long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the strategy agent and the scheduled GEX capture
    Run,
    /// Compute a gamma exposure snapshot once and print it as JSON
    Gex {
        /// Underlying symbol (e.g. "QQQ", "$SPX")
        #[arg(short, long)]
        symbol: String,
        /// Expiration dates to include; defaults to today's contracts
        #[arg(short, long)]
        expiration: Vec<NaiveDate>,
        /// Retain per-contract detail in the per-strike entries
        #[arg(long)]
        details: bool,
    },
    /// List available option expiration dates for a symbol
    Expirations {
        #[arg(short, long)]
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match cli.profile.as_deref() {
        Some(profile) => ConfigLoader::load_with_profile(profile)?,
        None => ConfigLoader::load()?,
    };

    match cli.command {
        Commands::Run => run_daemon(config).await,
        Commands::Gex {
            symbol,
            expiration,
            details,
        } => run_gex_once(config, &symbol, expiration, details).await,
        Commands::Expirations { symbol } => run_expirations(config, &symbol).await,
    }
}

async fn run_daemon(config: AppConfig) -> anyhow::Result<()> {
    config.agent.validate()?;
    let broker = build_broker(&config.broker);
    let clock = Arc::new(SystemClock);

    let (orders, positions, quotes, snapshots): (
        Arc<dyn OrderStore>,
        Arc<dyn PositionStore>,
        Arc<dyn QuoteStore>,
        Arc<dyn GexSnapshotStore>,
    ) = if config.agent.simulated {
        info!("Simulated mode: using the in-memory store");
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), store.clone(), store.clone(), store)
    } else {
        let database =
            DatabaseClient::new(&config.database.url, config.database.max_connections).await?;
        database.ensure_schema().await?;
        let pool = database.pool();
        (
            Arc::new(OrderRepository::new(pool.clone())),
            Arc::new(PositionRepository::new(pool.clone())),
            Arc::new(QuoteRepository::new(pool.clone())),
            Arc::new(GexSnapshotRepository::new(pool)),
        )
    };

    let controller = StrategyController::new(
        broker.clone(),
        orders,
        positions,
        quotes,
        clock.clone(),
        config.agent.clone(),
    );
    let strategy = StrategyService::new(controller);
    let gex = GexService::new(broker, snapshots, clock, config.gex.clone());

    tokio::select! {
        result = strategy.run() => result,
        () = gex.run() => Ok(()),
    }
}

async fn run_gex_once(
    config: AppConfig,
    symbol: &str,
    expirations: Vec<NaiveDate>,
    details: bool,
) -> anyhow::Result<()> {
    let service = gex_service(config);
    let expirations = (!expirations.is_empty()).then_some(expirations);
    let total = service
        .compute_gamma_exposure(symbol, expirations, !details)
        .await?;
    println!("{}", serde_json::to_string_pretty(&total)?);
    Ok(())
}

async fn run_expirations(config: AppConfig, symbol: &str) -> anyhow::Result<()> {
    let service = gex_service(config);
    for date in service.fetch_expiration_dates(symbol).await? {
        println!("{date}");
    }
    Ok(())
}

/// A GEX service over a throwaway store, for the one-shot commands.
fn gex_service(config: AppConfig) -> GexService {
    GexService::new(
        build_broker(&config.broker),
        Arc::new(InMemoryStore::new()),
        Arc::new(SystemClock),
        config.gex,
    )
}

fn build_broker(config: &BrokerConfig) -> Arc<dyn BrokerGateway> {
    if config.access_token.is_empty() {
        warn!("No brokerage access token configured; using the paper broker");
        Arc::new(PaperBroker::new())
    } else {
        Arc::new(RetryingBroker::new(SchwabClient::new(config.clone())))
    }
}
