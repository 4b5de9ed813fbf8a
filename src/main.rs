//! Agora CLI
//!
//! Command-line client for the governance registry:
//! - Connect a wallet account
//! - List proposals
//! - Submit a proposal and wait for it to be mined
//! - Watch for new proposals
//! - Generate a default config file

use agora::config::{generate_default_config, Config, LoggingConfig};
use agora::render::{self, OutputFormat};
use agora::wallet::{JsonRpcWallet, MemoryWallet, WalletProvider};
use agora::{Address, ChainId, GovernanceApp};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Registry address used by `--simulated` when none is configured
const SIMULATED_REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

#[derive(Parser)]
#[command(name = "agora")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Submit and browse on-chain governance proposals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/agora/config.toml or ./agora.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides the config file
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Use an in-process simulated chain instead of a node
    #[arg(long, global = true)]
    pub simulated: bool,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Request account access and print the connected account
    Connect,

    /// List all proposals
    List,

    /// Submit a proposal
    Create {
        /// Proposal title
        #[arg(short, long)]
        title: String,
        /// Proposal description
        #[arg(short, long)]
        description: String,
    },

    /// Print new proposals as they are created
    Watch,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("agora={}", config.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so JSON output on stdout stays parseable
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.rpc_url {
        config.rpc.url = url.clone();
    }

    init_logging(&config.logging);
    tracing::debug!("Agora v{}", env!("CARGO_PKG_VERSION"));

    if cli.simulated {
        if config.contract.address.is_none() {
            config.contract.address = Some(SIMULATED_REGISTRY.to_string());
        }
        let wallet = MemoryWallet::new(ChainId(config.contract.chain_id));
        if let Ok(target) = config.contract.target() {
            wallet.deploy_registry(target.address);
        }
        tracing::info!("Using simulated chain {}", config.contract.chain_id);
        run(&cli, &config, Arc::new(wallet)).await
    } else {
        let wallet = JsonRpcWallet::new(&config.rpc)?;
        tracing::info!(url = wallet.url(), "Using JSON-RPC wallet");
        run(&cli, &config, Arc::new(wallet)).await
    }
}

async fn run<W: WalletProvider>(cli: &Cli, config: &Config, wallet: Arc<W>) -> anyhow::Result<()> {
    let mut app = GovernanceApp::new(config, Some(wallet));

    match &cli.command {
        Commands::Connect => match app.connect().await? {
            Some(account) => print_account(account, cli.format)?,
            None => bail!("No account authorized"),
        },

        Commands::List => {
            app.start().await?;
            println!("{}", render::render_cards(&app.cards(), cli.format)?);
        }

        Commands::Create { title, description } => {
            if app.connect().await?.is_none() {
                bail!("No account authorized");
            }
            app.form_mut().set_title(title.as_str());
            app.form_mut().set_description(description.as_str());

            match app.submit().await? {
                Some(receipt) => println!("{}", render::render_receipt(&receipt, cli.format)?),
                None => {
                    let reason = app
                        .status()
                        .map(|s| s.text.clone())
                        .unwrap_or_else(|| "Proposal not submitted".to_string());
                    bail!(reason);
                }
            }
        }

        Commands::Watch => watch(&mut app, config, cli.format).await?,

        // Handled before a wallet is created
        Commands::Config { .. } => {}
    }

    app.shutdown();
    Ok(())
}

fn print_account(account: Address, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!(
            "{}",
            render::render_json(&serde_json::json!({ "account": account }))?
        ),
        OutputFormat::Table => println!("Connected {} ({})", account.short(), account),
    }
    Ok(())
}

async fn watch<W: WalletProvider>(
    app: &mut GovernanceApp<W>,
    config: &Config,
    format: OutputFormat,
) -> anyhow::Result<()> {
    app.start().await?;
    let Some(mut events) = app.gateway().map(|g| g.subscribe()) else {
        bail!("Wallet provider not found");
    };

    println!("{}", render::render_cards(&app.cards(), format)?);
    tracing::info!("Watching for new proposals (Ctrl+C to stop)");

    let mut ticker = tokio::time::interval(config.rpc.poll_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                // Failures are already on the status line; keep polling
                if app.pump_events().await.is_err() {
                    if let Some(status) = app.status() {
                        eprintln!("{}", status.text);
                    }
                }
                for event in events.drain() {
                    println!("{}", render::render_event(&event, format)?);
                }
            }
        }
    }

    events.unsubscribe();
    Ok(())
}
