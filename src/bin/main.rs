use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use wallet_refresh_sdk::logging::{init_logging, LogLevel, LoggingConfig};
use wallet_refresh_sdk::sources::{
    AssetBalance, LiquidityPosition, UniqueToken, WalletConnectSession,
};
use wallet_refresh_sdk::{
    profiles::address_hashed_profile, AccountStore, Error, FnSource, Network, RefreshConfig,
    RefreshCoordinator, RefreshTrigger, SessionContext, SourceKind, SourcePayload,
    SourceRegistry,
};

const DEMO_ADDRESSES: [&str; 2] = [
    "0x7a3d05c70581bd345fe117c06e45f9669205384f",
    "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984",
];

#[derive(Parser)]
#[command(name = "wallet-refresh")]
#[command(about = "Account data refresh coordinator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a refresh against simulated sources
    Simulate(SimulateArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct SimulateArgs {
    /// Network to refresh on, overrides the config file
    #[arg(short, long)]
    network: Option<Network>,

    /// Latency of every simulated source in milliseconds
    #[arg(long, default_value_t = 200)]
    latency_ms: u64,

    /// Sources that should fail, may be repeated
    #[arg(long)]
    fail: Vec<SourceKind>,

    /// Enable the profiles feature (ENS avatars)
    #[arg(long)]
    profiles: bool,

    /// Number of back-to-back refresh triggers to fire
    #[arg(long, default_value_t = 1)]
    triggers: usize,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging = logging.with_level(LogLevel::Debug);
    }
    init_logging(&logging)?;

    let config_path = cli.config.clone().unwrap_or_else(RefreshConfig::default_path);

    match cli.command {
        Commands::Simulate(args) => {
            let config = load_config(&cli.config, &config_path)?;
            simulate(config, args).await
        }
        Commands::Config(ConfigCommands::Show) => {
            let config = load_config(&cli.config, &config_path)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Config(ConfigCommands::Init) => {
            let config = RefreshConfig::load_or_create(&config_path)?;
            config.validate()?;
            println!("Configuration ready at {}", config_path.display());
            Ok(())
        }
        Commands::Config(ConfigCommands::Path) => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn load_config(explicit: &Option<PathBuf>, default_path: &PathBuf) -> anyhow::Result<RefreshConfig> {
    let config = match explicit {
        Some(path) => RefreshConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if default_path.exists() => RefreshConfig::load(default_path)?,
        None => RefreshConfig::load_layered()?,
    };
    config.validate()?;
    Ok(config)
}

async fn simulate(mut config: RefreshConfig, args: SimulateArgs) -> anyhow::Result<()> {
    if let Some(network) = args.network {
        config.network = network;
    }
    if args.profiles {
        config.features.profiles = true;
    }
    if config.wallet_addresses.is_empty() {
        config.wallet_addresses = DEMO_ADDRESSES.iter().map(|a| a.to_string()).collect();
    }

    let latency = Duration::from_millis(args.latency_ms);
    let registry = SourceKind::ALL
        .iter()
        .fold(SourceRegistry::new(), |registry, &kind| {
            let failing = args.fail.contains(&kind);
            registry.with(Arc::new(FnSource::new(kind, move |ctx: SessionContext| async move {
                tokio::time::sleep(latency).await;
                if failing {
                    return Err(Error::Network(format!("simulated {} outage", kind)));
                }
                Ok(simulated_payload(kind, &ctx))
            })))
        });

    let coordinator = Arc::new(RefreshCoordinator::new(
        config,
        registry,
        AccountStore::new(),
    )?);

    for attempt in 1..=args.triggers.max(1) {
        let accepted = coordinator.request_refresh(RefreshTrigger::UserGesture);
        println!("trigger {}: {}", attempt, if accepted { "accepted" } else { "dropped" });
    }
    coordinator.shutdown().await;

    match coordinator.last_report() {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => println!("No session ran"),
    }

    let snapshot = coordinator.store().snapshot().await;
    for (kind, entry) in snapshot {
        println!("{:<18} {} entries", kind, entry.payload.len());
    }
    Ok(())
}

fn simulated_payload(kind: SourceKind, ctx: &SessionContext) -> SourcePayload {
    let addresses = ctx.wallet_addresses.iter();
    match kind {
        SourceKind::WalletNames => SourcePayload::WalletNames(
            addresses
                .enumerate()
                .map(|(i, a)| (a.clone(), format!("wallet{}.eth", i + 1)))
                .collect(),
        ),
        SourceKind::RainbowProfiles => SourcePayload::RainbowProfiles(
            addresses.map(|a| (a.clone(), address_hashed_profile(a))).collect(),
        ),
        SourceKind::EnsAvatars => SourcePayload::EnsAvatars(
            addresses
                .map(|a| (a.clone(), format!("https://metadata.ens.domains/avatar/{}", a)))
                .collect::<BTreeMap<_, _>>(),
        ),
        SourceKind::UniqueTokens => SourcePayload::UniqueTokens(vec![UniqueToken {
            id: "1".to_string(),
            contract_address: "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85".to_string(),
            name: "rainbow.eth".to_string(),
            collection: Some("ENS: Ethereum Name Service".to_string()),
            image_url: None,
        }]),
        SourceKind::OnchainBalances => SourcePayload::OnchainBalances(vec![AssetBalance {
            symbol: "ETH".to_string(),
            address: "eth".to_string(),
            amount: "1250000000000000000".to_string(),
            decimals: 18,
            price_usd: ctx.balance_options.with_prices.then_some(1800.0),
        }]),
        SourceKind::WalletConnect => SourcePayload::WalletConnect(vec![WalletConnectSession {
            peer_id: "demo-peer".to_string(),
            dapp_name: "Uniswap".to_string(),
            dapp_url: "https://app.uniswap.org".to_string(),
            chain_id: ctx.network.chain_id(),
            accounts: ctx.wallet_addresses.to_vec(),
        }]),
        SourceKind::Positions => SourcePayload::Positions(vec![LiquidityPosition {
            pool_address: "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc".to_string(),
            token0: "USDC".to_string(),
            token1: "WETH".to_string(),
            liquidity: "1000000".to_string(),
        }]),
    }
}
