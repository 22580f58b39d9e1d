//! Transaction builder
//!
//! - **errors**: build and submission error taxonomy
//! - **instructions**: SPL token, associated-token and wrapped SOL
//!   instruction planning
//! - **batch**: packing instruction batches into signed v0 transactions and
//!   submitting them in order
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use item_market::chain::TransactionSubmitter;
//! use item_market::tx_builder::{submit_batches, InstructionBatch, TransactionBuilderError};
//! use solana_sdk::{instruction::Instruction, signature::Keypair};
//!
//! # async fn example(
//! #     submitter: &dyn TransactionSubmitter,
//! #     instructions: Vec<Instruction>,
//! # ) -> Result<(), TransactionBuilderError> {
//! let payer = Arc::new(Keypair::new());
//! let cosigner = Arc::new(Keypair::new());
//! let report = submit_batches(
//!     submitter,
//!     &payer,
//!     vec![InstructionBatch::new(instructions, vec![cosigner])],
//! )
//! .await?;
//! println!("landed {} transactions", report.signatures.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod errors;
pub mod instructions;

pub use batch::{plan_transactions, sign_message, submit_batches, InstructionBatch, SubmissionReport};
pub use errors::TransactionBuilderError;
pub use instructions::{
    create_mint_instructions, ensure_token_account, mint_account_len, transfer_mint_authority,
    unwrap_native, wrap_native, ITEM_DECIMALS,
};
