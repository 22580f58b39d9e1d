//! Blockchain read and write seams
//!
//! The pipelines only see these two traits. [`rpc::RpcChain`] implements both
//! over JSON-RPC; tests use the in-memory ledger from `test_utils`.

pub mod rpc;

pub use rpc::RpcChain;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};

use crate::errors::{MarketError, SubmitError};
use crate::market_program::{CurveState, MarketState};
use crate::pricing::{self, Quote};
use crate::types::Availability;

/// Decoded SPL mint fields the pipelines care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintState {
    pub supply: u64,
    pub decimals: u8,
    pub mint_authority: Option<Pubkey>,
}

/// Market, curve and item supply read together
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub address: Pubkey,
    pub market: MarketState,
    pub curve: CurveState,
    pub availability: Availability,
}

/// Read access to chain state
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Decode the market account, `MarketNotFound` if absent
    async fn get_market(&self, address: &Pubkey) -> Result<MarketState, MarketError>;

    async fn get_curve(&self, address: &Pubkey) -> Result<CurveState, MarketError>;

    /// Decode an SPL mint, `MintNotFound` if absent or not a mint
    async fn get_mint_state(&self, mint: &Pubkey) -> Result<MintState, MarketError>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, MarketError>;

    /// Lamports for a rent-exempt account of `data_len` bytes
    async fn minimum_rent(&self, data_len: usize) -> Result<u64, MarketError>;

    /// Read a market together with its curve and live item supply
    async fn market_snapshot(&self, address: &Pubkey) -> Result<MarketSnapshot, MarketError> {
        let market = self.get_market(address).await?;
        let curve = self.get_curve(&market.curve).await?;
        let mint = self.get_mint_state(&market.target_mint).await?;
        Ok(MarketSnapshot {
            address: *address,
            availability: Availability {
                supply: mint.supply,
                cap: market.mint_cap,
            },
            market,
            curve,
        })
    }

    /// Price of `quantity` units at the market's current curve state
    async fn get_curve_quote(
        &self,
        market: &Pubkey,
        quantity: u64,
    ) -> Result<(MarketSnapshot, Quote), MarketError> {
        let snapshot = self.market_snapshot(market).await?;
        let quote = pricing::quote(&snapshot.curve.config, quantity)?;
        Ok((snapshot, quote))
    }
}

/// Write access to the chain
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, SubmitError>;

    /// Send a signed transaction and wait for confirmation
    async fn submit_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SubmitError>;
}
