//! Error taxonomy for the market creation and buy pipelines
//!
//! Every failure the core can raise is a [`MarketError`]. Variants carry enough
//! structure (kind plus underlying message) for a presentation layer to render
//! them without parsing strings. Submission failures are classified once, in
//! [`MarketError::from_submit`], so that program-enforced cap and price-bound
//! violations surface as `SoldOut` and `SlippageExceeded` no matter which
//! pipeline hit them.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::market_program::error::MarketProgramError;

/// Comprehensive error type for all market operations
#[derive(Error, Debug)]
pub enum MarketError {
    /// Malformed address or out-of-range field, caught before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Off-chain content staging failed
    ///
    /// Fatal to market creation. Nothing has been written on chain when this
    /// is raised.
    #[error("Storage unavailable ({stage}): {reason}")]
    StorageUnavailable {
        /// Which phase of the two-phase upload failed
        stage: &'static str,
        /// Underlying transport or service message
        reason: String,
        /// Whether the service failure looked transient
        retryable: bool,
    },

    /// An account that was about to be created already exists
    ///
    /// The payment-holding account path is idempotent and never raises this.
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(Pubkey),

    /// The network or a program rejected a submitted transaction
    #[error("Transaction rejected: {reason}")]
    TransactionRejected {
        /// Underlying network or program error
        reason: String,
    },

    /// The supply cap is reached or the request would cross it
    #[error("Sold out: requested {requested}, remaining {remaining}")]
    SoldOut {
        requested: u64,
        remaining: u64,
    },

    /// The program refused the purchase because the price moved past the bound
    #[error("Slippage exceeded: required payment is above maximum {maximum_price}")]
    SlippageExceeded {
        /// The bound that was sent with the purchase
        maximum_price: u64,
    },

    /// No market account at this address
    #[error("Market not found: {0}")]
    MarketNotFound(Pubkey),

    /// No mint account at this address
    #[error("Mint not found: {0}")]
    MintNotFound(Pubkey),

    /// Chain read failure
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl MarketError {
    /// Whether re-quoting and resubmitting might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable { retryable, .. } => *retryable,
            Self::TransactionRejected { .. } => true,
            // A fresh quote yields a fresh bound
            Self::SlippageExceeded { .. } => true,
            Self::Rpc(_) => true,

            Self::InvalidInput(_) => false,
            Self::AccountAlreadyExists(_) => false,
            Self::SoldOut { .. } => false,
            Self::MarketNotFound(_) => false,
            Self::MintNotFound(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::StorageUnavailable { .. } => "storage",
            Self::AccountAlreadyExists(_) => "account_exists",
            Self::TransactionRejected { .. } => "rejected",
            Self::SoldOut { .. } => "sold_out",
            Self::SlippageExceeded { .. } => "slippage",
            Self::MarketNotFound(_) => "market_not_found",
            Self::MintNotFound(_) => "mint_not_found",
            Self::Rpc(_) => "rpc",
        }
    }

    /// Classify a submission failure
    ///
    /// `requested`/`maximum_price` describe the purchase in flight, if any, so
    /// that program-side cap and price violations carry the caller's numbers.
    pub fn from_submit(err: SubmitError, purchase: Option<PurchaseContext>) -> Self {
        if let (SubmitError::Program { code, .. }, Some(ctx)) = (&err, purchase) {
            match MarketProgramError::from_code(*code) {
                Some(MarketProgramError::PassedMintCap) => {
                    return Self::SoldOut {
                        requested: ctx.requested,
                        remaining: 0,
                    };
                }
                Some(MarketProgramError::PriceTooHigh) => {
                    return Self::SlippageExceeded {
                        maximum_price: ctx.maximum_price,
                    };
                }
                _ => {}
            }
        }
        Self::TransactionRejected {
            reason: err.to_string(),
        }
    }
}

// Convenience constructors for common error scenarios
impl MarketError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn rpc(reason: impl Into<String>) -> Self {
        Self::Rpc(reason.into())
    }
}

/// Numbers of the purchase being submitted, used to enrich classified errors
#[derive(Debug, Clone, Copy)]
pub struct PurchaseContext {
    pub requested: u64,
    pub maximum_price: u64,
}

/// Failure reported by a [`crate::chain::TransactionSubmitter`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// A program returned a custom error code from instruction `index`
    #[error("program error {code:#x} in instruction {index}")]
    Program { index: u8, code: u32 },

    /// The runtime rejected the transaction for a non-custom reason
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Transport or RPC failure before the transaction could be evaluated
    #[error("network error: {0}")]
    Network(String),
}
