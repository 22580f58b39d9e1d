//! Item Market CLI
//!
//! List an item for sale, quote a market, or buy units from it.
//!
//! ```text
//! item-market create --payment-mint <MINT> --name "Sword" --image sword.png --cap 10 --price 2.5
//! item-market quote --market <MARKET> --quantity 3
//! item-market buy --market <MARKET> --quantity 3 --slippage-bps 100
//! ```

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use item_market::chain::{ChainReader, RpcChain};
use item_market::config::Config;
use item_market::metrics::metrics;
use item_market::pricing::bps_to_fraction;
use item_market::storage::HttpContentStager;
use item_market::types::ProgramIds;
use item_market::wallet::WalletManager;
use item_market::{BuyEngine, ImageAsset, ItemDetails, MarketCreator, PurchaseIntent};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    print_metrics: bool,

    /// Deployed item market program, overrides `programs.market`
    #[arg(long, env = "ITEM_MARKET_PROGRAM")]
    market_program: Option<Pubkey>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List an item for sale
    Create {
        /// Mint buyers pay with
        #[arg(long)]
        payment_mint: Pubkey,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Image file uploaded with the metadata
        #[arg(long)]
        image: PathBuf,

        /// Total units that can ever be sold
        #[arg(long)]
        cap: u64,

        /// Price per unit in whole payment tokens, e.g. `2.5`
        #[arg(long)]
        price: f64,
    },

    /// Price of buying units from a market
    Quote {
        #[arg(long)]
        market: Pubkey,

        #[arg(long, default_value_t = 1)]
        quantity: u64,
    },

    /// Buy units from a market
    Buy {
        #[arg(long)]
        market: Pubkey,

        #[arg(long, default_value_t = 1)]
        quantity: u64,

        /// Allowed price movement in basis points, overrides the config
        #[arg(long)]
        slippage_bps: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(args.verbose, args.json)?;

    let mut config = load_config(&args.config)?;
    if let Some(program) = args.market_program {
        config.programs.market = Some(program.to_string());
    }
    config.validate().context("Invalid configuration")?;

    let chain = Arc::new(RpcChain::from_config(&config.rpc)?);
    let programs = ProgramIds::from_config(&config.programs)?;

    let result = match args.command {
        Command::Create {
            payment_mint,
            name,
            description,
            image,
            cap,
            price,
        } => {
            let wallet = load_wallet(&config)?;
            let payment = chain.get_mint_state(&payment_mint).await?;
            let unit_price = to_raw_amount(price, payment.decimals)?;
            let details = ItemDetails {
                name,
                description,
                image: read_image(&image).await?,
                quantity_cap: cap,
                unit_price,
            };

            let stager = Arc::new(HttpContentStager::from_config(&config.storage)?);
            let creator = MarketCreator::new(chain.clone(), chain.clone(), stager, programs);
            let created = creator
                .create_market(&wallet.keypair_arc(), &payment_mint, details)
                .await?;
            info!(market = %created.market, "market created");
            serde_json::to_string_pretty(&created)?
        }

        Command::Quote { market, quantity } => {
            let engine = BuyEngine::new(chain.clone(), chain.clone(), programs);
            let (snapshot, quote) = engine.quote(&market, quantity).await?;
            serde_json::to_string_pretty(&serde_json::json!({
                "market": market.to_string(),
                "payment_mint": snapshot.market.base_mint.to_string(),
                "quote": quote,
                "availability": {
                    "supply": snapshot.availability.supply,
                    "cap": snapshot.availability.cap,
                    "remaining": snapshot.availability.remaining(),
                },
            }))?
        }

        Command::Buy {
            market,
            quantity,
            slippage_bps,
        } => {
            let wallet = load_wallet(&config)?;
            let bps = slippage_bps.unwrap_or(config.trading.max_slippage_bps);
            let intent =
                PurchaseIntent::new(market, quantity).with_max_slippage(bps_to_fraction(bps));

            let engine = BuyEngine::new(chain.clone(), chain.clone(), programs);
            let receipt = engine.buy(&wallet.keypair_arc(), intent).await?;
            serde_json::to_string_pretty(&receipt)?
        }
    };

    println!("{result}");

    if args.print_metrics {
        eprintln!("{}", metrics().render());
    }
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "item_market=debug,info"
    } else {
        "item_market=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}

fn load_wallet(config: &Config) -> Result<WalletManager> {
    let wallet =
        WalletManager::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?;
    info!(wallet = %wallet.pubkey(), "wallet loaded");
    Ok(wallet)
}

/// Whole-token amount to raw units of a mint with `decimals`
fn to_raw_amount(amount: f64, decimals: u8) -> Result<u64> {
    if !amount.is_finite() || amount < 0.0 {
        bail!("price must be a non-negative number, got {amount}");
    }
    let raw = spl_token::ui_amount_to_amount(amount, decimals);
    if raw == u64::MAX {
        bail!("price {amount} does not fit the payment mint");
    }
    Ok(raw)
}

async fn read_image(path: &Path) -> Result<ImageAsset> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Image path has no file name")?
        .to_string();
    Ok(ImageAsset {
        content_type: content_type_for(path).to_string(),
        filename,
        bytes,
    })
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
