//! Address derivation
//!
//! Pure functions only. Whether an account exists at a derived address is an
//! I/O question answered by [`crate::chain::ChainReader::account_exists`].

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use crate::market_program::MARKET_SEED;

/// Market address for an item mint
///
/// Seeds are `["item-market", target_mint, index as u16 LE]`. The returned
/// bump is what the market program stores in the market account.
pub fn derive_market_address(program_id: &Pubkey, target_mint: &Pubkey, index: u16) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[MARKET_SEED, target_mint.as_ref(), &index.to_le_bytes()],
        program_id,
    )
}

/// Associated token account of `owner` for `mint`
///
/// Used both for the creator's payment-holding account and for a buyer's
/// payment and item accounts.
pub fn payment_holding_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Metaplex metadata account of `mint`
pub fn metadata_address(metadata_program: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[b"metadata", metadata_program.as_ref(), mint.as_ref()],
        metadata_program,
    )
    .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_program::DEFAULT_MARKET_INDEX;
    use crate::metadata::METADATA_PROGRAM_ID;

    const PROGRAM: Pubkey = Pubkey::new_from_array([7u8; 32]);

    #[test]
    fn test_market_address_is_stable() {
        let mint = Pubkey::new_unique();
        let a = derive_market_address(&PROGRAM, &mint, DEFAULT_MARKET_INDEX);
        let b = derive_market_address(&PROGRAM, &mint, DEFAULT_MARKET_INDEX);
        assert_eq!(a, b);
        assert!(!a.0.is_on_curve());
    }

    #[test]
    fn test_market_address_depends_on_index_and_mint() {
        let mint = Pubkey::new_unique();
        let (first, _) = derive_market_address(&PROGRAM, &mint, 0);
        let (second, _) = derive_market_address(&PROGRAM, &mint, 1);
        let (other, _) = derive_market_address(&PROGRAM, &Pubkey::new_unique(), 0);
        assert_ne!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_market_address_matches_seed_layout() {
        let mint = Pubkey::new_unique();
        let (address, bump) = derive_market_address(&PROGRAM, &mint, 0);
        let recreated = Pubkey::create_program_address(
            &[b"item-market", mint.as_ref(), &[0, 0], &[bump]],
            &PROGRAM,
        )
        .unwrap();
        assert_eq!(address, recreated);
    }

    #[test]
    fn test_holding_address_is_associated_account() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(
            payment_holding_address(&owner, &mint),
            get_associated_token_address(&owner, &mint)
        );
    }

    #[test]
    fn test_metadata_address_per_mint() {
        let a = metadata_address(&METADATA_PROGRAM_ID, &Pubkey::new_unique());
        let b = metadata_address(&METADATA_PROGRAM_ID, &Pubkey::new_unique());
        assert_ne!(a, b);
    }
}
