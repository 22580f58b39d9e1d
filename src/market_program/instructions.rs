//! Instruction builders for the market program
//!
//! Each builder is a pure function: it takes the already-derived addresses and
//! returns an [`Instruction`]. Account order is part of the program ABI and is
//! documented on each accounts struct.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use super::instruction_discriminator;
use super::state::{CurveConfig, RoyaltyConfig};

const INITIALIZE_CURVE: &str = "initialize_curve";
const INITIALIZE_MARKET: &str = "initialize_market";
const BUY: &str = "buy";

/// Arguments of `initialize_curve`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeCurveArgs {
    pub config: CurveConfig,
}

/// Arguments of `initialize_market`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeMarketArgs {
    pub index: u16,
    pub mint_cap: u64,
    pub royalties: RoyaltyConfig,
    pub bump_seed: u8,
}

/// Arguments of `buy`
///
/// `maximum_price` is the largest total payment the buyer accepts for
/// `desired_target_amount` units. The program rejects the purchase with
/// `PriceTooHigh` when the price at execution time is above it.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct BuyArgs {
    pub desired_target_amount: u64,
    pub maximum_price: u64,
}

/// Decoded market program instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketInstruction {
    InitializeCurve(InitializeCurveArgs),
    InitializeMarket(InitializeMarketArgs),
    Buy(BuyArgs),
}

impl MarketInstruction {
    /// Decode instruction data by discriminator. Returns `None` for unknown
    /// instructions or malformed bodies.
    pub fn unpack(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let (tag, mut body) = data.split_at(8);
        if tag == instruction_discriminator(INITIALIZE_CURVE) {
            InitializeCurveArgs::deserialize(&mut body)
                .ok()
                .map(Self::InitializeCurve)
        } else if tag == instruction_discriminator(INITIALIZE_MARKET) {
            InitializeMarketArgs::deserialize(&mut body)
                .ok()
                .map(Self::InitializeMarket)
        } else if tag == instruction_discriminator(BUY) {
            BuyArgs::deserialize(&mut body).ok().map(Self::Buy)
        } else {
            None
        }
    }
}

fn encode<T: BorshSerialize>(name: &str, args: &T) -> Vec<u8> {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(&instruction_discriminator(name));
    // Serializing into a Vec cannot fail
    data.extend(borsh::to_vec(args).unwrap_or_default());
    data
}

/// Create a curve account at `curve` (a fresh keypair that co-signs)
///
/// Accounts:
/// 0. payer (signer, writable)
/// 1. curve (signer, writable)
/// 2. system program
/// 3. rent sysvar
pub fn initialize_curve(
    program_id: &Pubkey,
    payer: &Pubkey,
    curve: &Pubkey,
    config: CurveConfig,
) -> Instruction {
    Instruction::new_with_bytes(
        *program_id,
        &encode(INITIALIZE_CURVE, &InitializeCurveArgs { config }),
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*curve, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
    )
}

/// Accounts of `initialize_market`, in ABI order
#[derive(Debug, Clone)]
pub struct InitializeMarketAccounts {
    /// Creator, pays for the market account and becomes its authority
    pub payer: Pubkey,
    pub curve: Pubkey,
    /// Program-derived market address
    pub market: Pubkey,
    pub base_mint: Pubkey,
    /// Item mint, whose mint authority must already be `market`
    pub target_mint: Pubkey,
    pub base_storage: Pubkey,
}

pub fn initialize_market(
    program_id: &Pubkey,
    accounts: &InitializeMarketAccounts,
    args: InitializeMarketArgs,
) -> Instruction {
    Instruction::new_with_bytes(
        *program_id,
        &encode(INITIALIZE_MARKET, &args),
        vec![
            AccountMeta::new(accounts.payer, true),
            AccountMeta::new_readonly(accounts.curve, false),
            AccountMeta::new(accounts.market, false),
            AccountMeta::new_readonly(accounts.base_mint, false),
            AccountMeta::new(accounts.target_mint, false),
            AccountMeta::new_readonly(accounts.base_storage, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
    )
}

/// Accounts of `buy`, in ABI order
#[derive(Debug, Clone)]
pub struct BuyAccounts {
    pub market: Pubkey,
    pub curve: Pubkey,
    pub base_mint: Pubkey,
    pub target_mint: Pubkey,
    pub base_storage: Pubkey,
    /// Buyer's payment token account
    pub source: Pubkey,
    /// Buyer's item token account
    pub destination: Pubkey,
    pub buyer: Pubkey,
}

pub fn buy(program_id: &Pubkey, accounts: &BuyAccounts, args: BuyArgs) -> Instruction {
    Instruction::new_with_bytes(
        *program_id,
        &encode(BUY, &args),
        vec![
            AccountMeta::new(accounts.market, false),
            AccountMeta::new_readonly(accounts.curve, false),
            AccountMeta::new_readonly(accounts.base_mint, false),
            AccountMeta::new(accounts.target_mint, false),
            AccountMeta::new(accounts.base_storage, false),
            AccountMeta::new(accounts.source, false),
            AccountMeta::new(accounts.destination, false),
            AccountMeta::new_readonly(accounts.buyer, true),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
    )
}
