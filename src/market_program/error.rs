//! Custom error codes returned by the market program

/// Program error codes (Anchor numbering, starting at 6000)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MarketProgramError {
    /// Required payment is above the purchase's `maximum_price`
    PriceTooHigh = 6000,
    /// Minting the requested amount would cross the market's supply cap
    PassedMintCap = 6001,
    /// Curve account does not hold a supported configuration
    InvalidCurve = 6002,
    /// Arithmetic overflow while pricing
    ArithmeticError = 6003,
    /// Buyer's payment account does not hold enough to cover the price
    InsufficientFunds = 6004,
}

impl MarketProgramError {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            6000 => Some(Self::PriceTooHigh),
            6001 => Some(Self::PassedMintCap),
            6002 => Some(Self::InvalidCurve),
            6003 => Some(Self::ArithmeticError),
            6004 => Some(Self::InsufficientFunds),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for err in [
            MarketProgramError::PriceTooHigh,
            MarketProgramError::PassedMintCap,
            MarketProgramError::InvalidCurve,
            MarketProgramError::ArithmeticError,
            MarketProgramError::InsufficientFunds,
        ] {
            assert_eq!(MarketProgramError::from_code(err as u32), Some(err));
        }
        assert_eq!(MarketProgramError::from_code(0), None);
    }
}
