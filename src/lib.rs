//! Item Market - bonding-curve item listings on Solana
//!
//! A seller lists an item as a fixed-price, supply-capped market; buyers
//! purchase units of it through the same market program.
//!
//! - [`create_market::MarketCreator`] stages off-chain metadata, creates the
//!   item mint with metadata and hands it to a new market
//! - [`buy_engine::BuyEngine`] quotes, bounds the payment by slippage and buys
//! - [`tx_builder::submit_batches`] packs instruction batches into as few
//!   transactions as fit and submits them in order
//! - [`address`] derives every account address the pipelines touch
//!
//! Chain access goes through the [`chain::ChainReader`] and
//! [`chain::TransactionSubmitter`] seams, content staging through
//! [`storage::ContentStager`].

pub mod address;
pub mod buy_engine;
pub mod chain;
pub mod compat;
pub mod config;
pub mod create_market;
pub mod errors;
pub mod market_program;
pub mod metadata;
pub mod metrics;
pub mod observability;
pub mod pricing;
pub mod storage;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod wallet;

// Re-export commonly used types
pub use buy_engine::{BuyEngine, LogNotifier, PurchaseNotifier};
pub use create_market::MarketCreator;
pub use errors::{MarketError, SubmitError};
pub use types::{CreatedMarket, ImageAsset, ItemDetails, PurchaseIntent, PurchaseReceipt};
