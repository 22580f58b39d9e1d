//! Common types used throughout the pipelines

use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::config::ProgramsConfig;
use crate::errors::MarketError;
use crate::metadata::{check_len, MAX_NAME_LENGTH, METADATA_PROGRAM_ID};

/// Default bound on price movement between quote and execution
pub const DEFAULT_MAX_SLIPPAGE: f64 = 0.05;

/// Program deployments the pipelines address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub market: Pubkey,
    pub metadata: Pubkey,
}

impl ProgramIds {
    /// A market program deployment paired with the canonical Metaplex program
    pub fn new(market: Pubkey) -> Self {
        Self {
            market,
            metadata: METADATA_PROGRAM_ID,
        }
    }

    pub fn from_config(config: &ProgramsConfig) -> Result<Self, MarketError> {
        Ok(Self {
            market: config.market_program()?,
            metadata: config.metadata_program()?,
        })
    }
}

/// Image attached to an item listing
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub filename: String,
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What a seller provides to list an item
#[derive(Debug, Clone)]
pub struct ItemDetails {
    pub name: String,
    pub description: String,
    pub image: ImageAsset,
    /// Total units that can ever be sold
    pub quantity_cap: u64,
    /// Price of one unit in raw payment token units
    pub unit_price: u64,
}

impl ItemDetails {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.name.trim().is_empty() {
            return Err(MarketError::invalid_input("item name is empty"));
        }
        check_len("name", &self.name, MAX_NAME_LENGTH)?;
        if self.quantity_cap == 0 {
            return Err(MarketError::invalid_input("quantity cap must be at least 1"));
        }
        if self.image.filename.trim().is_empty() {
            return Err(MarketError::invalid_input("image has no filename"));
        }
        if self.image.bytes.is_empty() {
            return Err(MarketError::invalid_input("image is empty"));
        }
        Ok(())
    }
}

/// Result of a successful market creation
#[derive(Debug, Clone, Serialize)]
pub struct CreatedMarket {
    /// Market address, the handle buyers use
    #[serde(with = "display")]
    pub market: Pubkey,
    /// Item token mint
    #[serde(with = "display")]
    pub target_mint: Pubkey,
    #[serde(with = "display")]
    pub curve: Pubkey,
    /// Creator's account receiving payments
    #[serde(with = "display")]
    pub base_storage: Pubkey,
    #[serde(with = "display")]
    pub metadata: Pubkey,
    pub uri: String,
    #[serde(with = "display_vec")]
    pub signatures: Vec<Signature>,
}

/// One attempt to buy units from a market
#[derive(Debug, Clone, Copy)]
pub struct PurchaseIntent {
    pub market: Pubkey,
    pub quantity: u64,
    /// Fraction in `[0, 1)`
    pub max_slippage: f64,
}

impl PurchaseIntent {
    pub fn new(market: Pubkey, quantity: u64) -> Self {
        Self {
            market,
            quantity,
            max_slippage: DEFAULT_MAX_SLIPPAGE,
        }
    }

    pub fn with_max_slippage(mut self, max_slippage: f64) -> Self {
        self.max_slippage = max_slippage;
        self
    }
}

/// Result of a successful purchase
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    #[serde(with = "display")]
    pub market: Pubkey,
    #[serde(with = "display")]
    pub target_mint: Pubkey,
    pub quantity: u64,
    /// Quoted payment at the time of submission
    pub quoted_total: u64,
    /// Bound the program enforced
    pub maximum_price: u64,
    #[serde(with = "display_vec")]
    pub signatures: Vec<Signature>,
}

/// Supply position of a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub supply: u64,
    pub cap: u64,
}

impl Availability {
    pub fn remaining(&self) -> u64 {
        self.cap.saturating_sub(self.supply)
    }

    pub fn is_sold_out(&self) -> bool {
        self.supply >= self.cap
    }
}

mod display {
    use serde::Serializer;
    use std::fmt::Display;

    pub fn serialize<T: Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }
}

mod display_vec {
    use serde::{ser::SerializeSeq, Serializer};
    use std::fmt::Display;

    pub fn serialize<T: Display, S: Serializer>(values: &[T], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }
}
