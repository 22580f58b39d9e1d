//! Client-side interface of the on-chain item market program
//!
//! The program owns two account types: a fixed-shape pricing
//! [`state::CurveState`] and a [`state::MarketState`] that binds a curve, an
//! item mint, a payment mint and a payment-holding account under a supply cap.
//! Instructions and accounts use Anchor framing: an 8 byte discriminator taken
//! from `sha256("global:<instruction>")` / `sha256("account:<Type>")`,
//! followed by a borsh body.
//!
//! The layouts here are this crate's own ABI. They are not wire compatible
//! with other bonding-curve programs, so there is no built-in deployment:
//! the program id always comes from `programs.market` in the configuration.

use sha2::{Digest, Sha256};

pub mod error;
pub mod instructions;
pub mod state;

pub use error::MarketProgramError;
pub use instructions::{
    buy, initialize_curve, initialize_market, BuyAccounts, BuyArgs, InitializeCurveArgs,
    InitializeMarketAccounts, InitializeMarketArgs, MarketInstruction,
};
pub use state::{CurveConfig, CurveState, MarketState, RoyaltyConfig};

/// Seed prefix of the market PDA
pub const MARKET_SEED: &[u8] = b"item-market";

/// Index of the market for a given item mint. Only the first slot is used.
pub const DEFAULT_MARKET_INDEX: u16 = 0;

/// Anchor instruction discriminator
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// Anchor account discriminator
pub fn account_discriminator(type_name: &str) -> [u8; 8] {
    sighash("account", type_name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}
