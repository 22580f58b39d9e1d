//! Configuration for the item market client
//!
//! Loaded from a TOML file, with `.env` applied first so that the binary's
//! environment-backed flags see it. Every section has defaults except the
//! market program id, which must always be given.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

use crate::errors::MarketError;
use crate::metadata::METADATA_PROGRAM_ID;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    /// Program deployments
    #[serde(default)]
    pub programs: ProgramsConfig,

    /// Off-chain content staging service
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub trading: TradingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// `processed`, `confirmed` or `finalized`
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsConfig {
    /// Deployed item market program. Required, there is no default deployment.
    #[serde(default)]
    pub market: Option<String>,

    #[serde(default = "default_metadata_program")]
    pub metadata: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the staging service
    #[serde(default = "default_storage_url")]
    pub base_url: String,

    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Maximum slippage tolerance (basis points)
    #[serde(default = "default_max_slippage")]
    pub max_slippage_bps: u16,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_rpc_timeout() -> u64 { 30_000 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_metadata_program() -> String { METADATA_PROGRAM_ID.to_string() }
fn default_storage_url() -> String { "http://localhost:8080".to_string() }
fn default_storage_timeout() -> u64 { 60 }
fn default_max_slippage() -> u16 { 500 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_ms: default_rpc_timeout(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            market: None,
            metadata: default_metadata_program(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_url(),
            timeout_secs: default_storage_timeout(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_slippage_bps: default_max_slippage(),
        }
    }
}

impl RpcConfig {
    pub fn commitment_config(&self) -> Result<CommitmentConfig, MarketError> {
        CommitmentConfig::from_str(&self.commitment).map_err(|_| {
            MarketError::invalid_input(format!("unknown commitment '{}'", self.commitment))
        })
    }
}

impl ProgramsConfig {
    pub fn market_program(&self) -> Result<Pubkey, MarketError> {
        match self.market.as_deref() {
            Some(value) => parse_program("market", value),
            None => Err(MarketError::invalid_input(
                "programs.market is not set, it must name the deployed item market program",
            )),
        }
    }

    pub fn metadata_program(&self) -> Result<Pubkey, MarketError> {
        parse_program("metadata", &self.metadata)
    }
}

fn parse_program(name: &str, value: &str) -> Result<Pubkey, MarketError> {
    Pubkey::from_str(value)
        .map_err(|e| MarketError::invalid_input(format!("{name} program id '{value}': {e}")))
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration after applying `.env`
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }

    /// Reject values the pipelines cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rpc.url.trim().is_empty() {
            return Err(anyhow!("rpc.url is empty"));
        }
        if self.rpc.timeout_ms == 0 {
            return Err(anyhow!("rpc.timeout_ms must be positive"));
        }
        self.rpc.commitment_config()?;
        self.programs.market_program()?;
        self.programs.metadata_program()?;
        if !self.storage.base_url.starts_with("http://")
            && !self.storage.base_url.starts_with("https://")
        {
            return Err(anyhow!(
                "storage.base_url '{}' is not an http(s) URL",
                self.storage.base_url
            ));
        }
        if self.trading.max_slippage_bps >= 10_000 {
            return Err(anyhow!(
                "max_slippage_bps {} must be below 10000",
                self.trading.max_slippage_bps
            ));
        }
        Ok(())
    }
}
