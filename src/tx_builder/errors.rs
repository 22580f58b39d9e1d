//! Error types for batch building and submission
//!
//! Build-time failures (packing, signer resolution, instruction encoding) are
//! kept apart from submission failures so that pipelines can attach purchase
//! context to the latter before surfacing a [`MarketError`].

use solana_sdk::signature::Signature;
use thiserror::Error;

use crate::errors::{MarketError, PurchaseContext, SubmitError};

/// Error type for all transaction builder operations
#[derive(Error, Debug)]
pub enum TransactionBuilderError {
    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program ID that failed to build an instruction
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// A single instruction does not fit in a transaction on its own
    #[error("Instruction {index} alone needs {size} bytes, limit is {limit}")]
    Oversized {
        index: usize,
        size: usize,
        limit: usize,
    },

    /// A required signer is not provided by any batch
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Message compilation failed
    #[error("Message compile error: {0}")]
    Compile(String),

    /// Transaction `index` of the sequence was rejected
    ///
    /// `completed` holds the signatures of transactions that already landed.
    #[error("Transaction {index} of {total} failed: {source}")]
    Submission {
        index: usize,
        total: usize,
        completed: Vec<Signature>,
        #[source]
        source: SubmitError,
    },
}

impl TransactionBuilderError {
    /// Check if this error is potentially retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Submission { source, .. } => !matches!(source, SubmitError::Program { .. }),

            Self::InstructionBuild { .. } => false,
            Self::Oversized { .. } => false,
            Self::Signing(_) => false,
            Self::Compile(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InstructionBuild { .. } => "instruction",
            Self::Oversized { .. } => "oversized",
            Self::Signing(_) => "signing",
            Self::Compile(_) => "compile",
            Self::Submission { .. } => "submission",
        }
    }

    /// Surface as a pipeline error
    ///
    /// Build-time failures are caller input problems. Submission failures are
    /// classified with the purchase in flight, if any.
    pub fn into_market_error(self, purchase: Option<PurchaseContext>) -> MarketError {
        match self {
            Self::Submission { source, .. } => MarketError::from_submit(source, purchase),
            other => MarketError::invalid_input(other.to_string()),
        }
    }
}

// Convenience constructors for common error scenarios
impl TransactionBuilderError {
    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_signer(pubkey: impl std::fmt::Display) -> Self {
        Self::Signing(format!("no keypair provided for required signer {pubkey}"))
    }
}

impl From<TransactionBuilderError> for MarketError {
    fn from(err: TransactionBuilderError) -> Self {
        err.into_market_error(None)
    }
}
