//! Token program instruction planning
//!
//! Stateless builders for the SPL token and associated-token instructions the
//! pipelines need. Failures from the upstream builders are mapped to
//! [`TransactionBuilderError::InstructionBuild`].

use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::{
    instruction::{close_account, initialize_mint2, set_authority, sync_native, AuthorityType},
    native_mint,
    solana_program::program_pack::Pack,
    state::Mint,
};

use crate::tx_builder::errors::TransactionBuilderError;

/// Item tokens are whole units
pub const ITEM_DECIMALS: u8 = 0;

/// Space of an SPL mint account
pub fn mint_account_len() -> usize {
    Mint::LEN
}

/// Create and initialize a new mint
///
/// Produces two instructions, in order:
/// 1. system `create_account` funded with `rent_lamports`, owned by SPL token
/// 2. `initialize_mint2` with `authority` as mint authority and no freeze
///    authority
///
/// `mint` must co-sign the transaction.
pub fn create_mint_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    authority: &Pubkey,
    decimals: u8,
    rent_lamports: u64,
) -> Result<Vec<Instruction>, TransactionBuilderError> {
    let create = system_instruction::create_account(
        payer,
        mint,
        rent_lamports,
        Mint::LEN as u64,
        &spl_token::id(),
    );
    let initialize = initialize_mint2(&spl_token::id(), mint, authority, None, decimals)
        .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))?;

    Ok(vec![create, initialize])
}

/// Hand the mint authority of `mint` from `current` to `new_authority`
pub fn transfer_mint_authority(
    mint: &Pubkey,
    current: &Pubkey,
    new_authority: &Pubkey,
) -> Result<Instruction, TransactionBuilderError> {
    set_authority(
        &spl_token::id(),
        mint,
        Some(new_authority),
        AuthorityType::MintTokens,
        current,
        &[],
    )
    .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))
}

/// Create the associated token account of `owner` for `mint` unless it exists
///
/// The idempotent variant succeeds when the account is already there, so the
/// instruction is safe even if a concurrent caller created it first.
pub fn ensure_token_account(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(payer, owner, mint, &spl_token::id())
}

/// Move `lamports` of native SOL into `owner`'s wrapped SOL account
///
/// Produces, in order: idempotent create of the account, system transfer of
/// `lamports` into it, and `sync_native` so its token balance matches.
pub fn wrap_native(owner: &Pubkey, lamports: u64) -> Result<Vec<Instruction>, TransactionBuilderError> {
    let account = get_associated_token_address(owner, &native_mint::id());
    let sync = sync_native(&spl_token::id(), &account)
        .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))?;

    Ok(vec![
        ensure_token_account(owner, owner, &native_mint::id()),
        system_instruction::transfer(owner, &account, lamports),
        sync,
    ])
}

/// Close `owner`'s wrapped SOL account, returning every lamport left in it
pub fn unwrap_native(owner: &Pubkey) -> Result<Instruction, TransactionBuilderError> {
    let account = get_associated_token_address(owner, &native_mint::id());
    close_account(&spl_token::id(), &account, owner, owner, &[])
        .map_err(|e| TransactionBuilderError::instruction_failed("spl_token", e.to_string()))
}
