//! Account layouts owned by the market program

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use super::account_discriminator;
use crate::errors::MarketError;

/// Royalty rates in basis points. Every market created here uses zero on
/// both legs and both directions.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoyaltyConfig {
    pub buy_base_bps: u32,
    pub buy_target_bps: u32,
    pub sell_base_bps: u32,
    pub sell_target_bps: u32,
}

impl RoyaltyConfig {
    pub const fn disabled() -> Self {
        Self {
            buy_base_bps: 0,
            buy_target_bps: 0,
            sell_base_bps: 0,
            sell_target_bps: 0,
        }
    }
}

/// Pricing function parameters
///
/// Price per unit at supply `s` is `c * s^(pow/frac) + b`, in raw payment
/// token units. Only the constant shape (`pow == 0` or `c == 0`) is evaluated
/// client side; see [`crate::pricing`].
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveConfig {
    Exponential { c: u64, b: u64, pow: u8, frac: u8 },
}

impl CurveConfig {
    /// Flat price per unit, independent of supply
    pub const fn fixed_price(unit_price: u64) -> Self {
        Self::Exponential {
            c: 0,
            b: unit_price,
            pow: 0,
            frac: 1,
        }
    }
}

/// Curve account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CurveState {
    pub config: CurveConfig,
}

/// Market account, the binding of curve, item mint and payment account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    /// Creator that initialized the market
    pub authority: Pubkey,
    /// Payment token
    pub base_mint: Pubkey,
    /// Item token
    pub target_mint: Pubkey,
    /// Payment-holding account receiving every purchase
    pub base_storage: Pubkey,
    pub curve: Pubkey,
    /// Immutable supply cap of the item token
    pub mint_cap: u64,
    pub royalties: RoyaltyConfig,
    /// Always zero, royalties are disabled
    pub accrued_royalties: u64,
    pub index: u16,
    pub bump_seed: u8,
}

/// Discriminated borsh encoding shared by all program accounts
pub trait ProgramAccount: BorshSerialize + BorshDeserialize + Sized {
    /// Anchor type name used for the discriminator
    const TYPE_NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        account_discriminator(Self::TYPE_NAME)
    }

    /// Decode account data, rejecting foreign discriminators
    ///
    /// Trailing bytes are allowed since accounts are allocated with padding.
    fn try_from_account_data(data: &[u8]) -> Result<Self, MarketError> {
        if data.len() < 8 || data[..8] != Self::discriminator() {
            return Err(MarketError::invalid_input(format!(
                "account data is not a {}",
                Self::TYPE_NAME
            )));
        }
        let mut body = &data[8..];
        Self::deserialize(&mut body).map_err(|e| {
            MarketError::invalid_input(format!("malformed {}: {}", Self::TYPE_NAME, e))
        })
    }

    fn to_account_data(&self) -> Vec<u8> {
        let mut data = Self::discriminator().to_vec();
        // Writing into a Vec cannot fail
        data.extend(borsh::to_vec(self).unwrap_or_default());
        data
    }
}

impl ProgramAccount for CurveState {
    const TYPE_NAME: &'static str = "PricingCurve";
}

impl ProgramAccount for MarketState {
    const TYPE_NAME: &'static str = "ItemMarket";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_market() -> MarketState {
        MarketState {
            authority: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            target_mint: Pubkey::new_unique(),
            base_storage: Pubkey::new_unique(),
            curve: Pubkey::new_unique(),
            mint_cap: 10,
            royalties: RoyaltyConfig::disabled(),
            accrued_royalties: 0,
            index: 0,
            bump_seed: 254,
        }
    }

    #[test]
    fn test_market_decodes_with_padding() {
        let market = sample_market();
        let mut data = market.to_account_data();
        data.extend_from_slice(&[0u8; 64]);
        assert_eq!(MarketState::try_from_account_data(&data).unwrap(), market);
    }

    #[test]
    fn test_foreign_discriminator_rejected() {
        let curve = CurveState {
            config: CurveConfig::fixed_price(2),
        };
        let err = MarketState::try_from_account_data(&curve.to_account_data()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidInput(_)));
    }

    #[test]
    fn test_short_data_rejected() {
        assert!(CurveState::try_from_account_data(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_fixed_price_shape() {
        assert_eq!(
            CurveConfig::fixed_price(5),
            CurveConfig::Exponential {
                c: 0,
                b: 5,
                pow: 0,
                frac: 1
            }
        );
    }
}
