//! Metaplex token metadata
//!
//! Builds `CreateMetadataAccountV3` by hand: a one byte instruction
//! discriminant followed by the borsh-encoded arguments.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::errors::MarketError;

/// Metaplex token metadata program
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Discriminant of `CreateMetadataAccountV3`
pub const CREATE_METADATA_ACCOUNT_V3: u8 = 33;

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    pub share: u8,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub verified: bool,
    pub key: Pubkey,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseMethod {
    Burn,
    Multiple,
    Single,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Uses {
    pub use_method: UseMethod,
    pub remaining: u64,
    pub total: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum CollectionDetails {
    V1 { size: u64 },
}

/// On-chain metadata fields
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataV2 {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
    pub collection: Option<Collection>,
    pub uses: Option<Uses>,
}

impl DataV2 {
    /// Item listing metadata: empty symbol, no fee, no creators, collection or uses
    pub fn for_item(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: String::new(),
            uri: uri.into(),
            seller_fee_basis_points: 0,
            creators: None,
            collection: None,
            uses: None,
        }
    }

    /// Enforce the program's field length limits
    pub fn validate(&self) -> Result<(), MarketError> {
        check_len("name", &self.name, MAX_NAME_LENGTH)?;
        check_len("symbol", &self.symbol, MAX_SYMBOL_LENGTH)?;
        check_len("uri", &self.uri, MAX_URI_LENGTH)
    }
}

/// Arguments of `CreateMetadataAccountV3`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateMetadataAccountArgsV3 {
    pub data: DataV2,
    pub is_mutable: bool,
    pub collection_details: Option<CollectionDetails>,
}

impl CreateMetadataAccountArgsV3 {
    /// Decode instruction data, `None` for any other metadata instruction
    pub fn unpack(data: &[u8]) -> Option<Self> {
        match data.split_first() {
            Some((&CREATE_METADATA_ACCOUNT_V3, mut body)) => Self::deserialize(&mut body).ok(),
            _ => None,
        }
    }
}

pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<(), MarketError> {
    if value.len() > max {
        return Err(MarketError::invalid_input(format!(
            "metadata {field} is {} bytes, limit is {max}",
            value.len()
        )));
    }
    Ok(())
}

/// Accounts of `CreateMetadataAccountV3`
#[derive(Debug, Clone)]
pub struct CreateMetadataAccounts {
    pub metadata: Pubkey,
    pub mint: Pubkey,
    pub mint_authority: Pubkey,
    pub payer: Pubkey,
    pub update_authority: Pubkey,
}

/// Build `CreateMetadataAccountV3`, mutable and without collection details
///
/// Field limits are checked here so a bad name fails before anything is sent.
pub fn create_metadata_account_v3(
    program_id: &Pubkey,
    accounts: &CreateMetadataAccounts,
    data: DataV2,
) -> Result<Instruction, MarketError> {
    data.validate()?;

    let args = CreateMetadataAccountArgsV3 {
        data,
        is_mutable: true,
        collection_details: None,
    };
    let mut bytes = vec![CREATE_METADATA_ACCOUNT_V3];
    bytes.extend(
        borsh::to_vec(&args)
            .map_err(|e| MarketError::invalid_input(format!("metadata encoding: {e}")))?,
    );

    Ok(Instruction::new_with_bytes(
        *program_id,
        &bytes,
        vec![
            AccountMeta::new(accounts.metadata, false),
            AccountMeta::new_readonly(accounts.mint, false),
            AccountMeta::new_readonly(accounts.mint_authority, true),
            AccountMeta::new(accounts.payer, true),
            AccountMeta::new_readonly(accounts.update_authority, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
    ))
}
