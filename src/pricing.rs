//! Price quotes and slippage bounds
//!
//! Only the flat curve shape produced by market creation is evaluated here
//! (`pow == 0` or `c == 0`). Any other shape is priced by the program alone and
//! a client-side quote is refused rather than guessed.

use serde::Serialize;

use crate::errors::MarketError;
use crate::market_program::CurveConfig;

const PPM: u128 = 1_000_000;

/// Payment for a number of units at the curve state it was read from
///
/// A quote is valid for one submission attempt. Re-read the curve before
/// every retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub quantity: u64,
    /// Price of one unit in raw payment token units
    pub unit_price: u64,
    /// `unit_price * quantity`
    pub total: u64,
}

/// Price `quantity` units under `curve`
pub fn quote(curve: &CurveConfig, quantity: u64) -> Result<Quote, MarketError> {
    let unit_price = match *curve {
        // s^0 == 1 for every supply
        CurveConfig::Exponential { c, b, pow: 0, .. } => c
            .checked_add(b)
            .ok_or_else(|| MarketError::invalid_input("curve price overflows u64"))?,
        CurveConfig::Exponential { c: 0, b, .. } => b,
        CurveConfig::Exponential { c, pow, frac, .. } => {
            return Err(MarketError::invalid_input(format!(
                "cannot quote non-constant curve (c={c}, pow={pow}, frac={frac})"
            )));
        }
    };

    let total = unit_price.checked_mul(quantity).ok_or_else(|| {
        MarketError::invalid_input(format!(
            "price of {quantity} units at {unit_price} overflows u64"
        ))
    })?;

    Ok(Quote {
        quantity,
        unit_price,
        total,
    })
}

/// Reject slippage fractions outside `[0, 1)`
pub fn validate_slippage(max_slippage: f64) -> Result<(), MarketError> {
    if !max_slippage.is_finite() || !(0.0..1.0).contains(&max_slippage) {
        return Err(MarketError::invalid_input(format!(
            "max slippage {max_slippage} must be a finite fraction in [0, 1)"
        )));
    }
    Ok(())
}

/// Upper bound on payment sent with a purchase
///
/// `floor(total * (1 + max_slippage))`, computed in parts per million so the
/// bound is never below the quote. Saturates at `u64::MAX`.
pub fn max_payment(quote: &Quote, max_slippage: f64) -> Result<u64, MarketError> {
    validate_slippage(max_slippage)?;

    let slippage_ppm = (max_slippage * PPM as f64).floor() as u128;
    let total = quote.total as u128;
    let bound = total + total * slippage_ppm / PPM;

    Ok(u64::try_from(bound).unwrap_or(u64::MAX))
}

/// Convert basis points from configuration into a slippage fraction
pub fn bps_to_fraction(bps: u16) -> f64 {
    f64::from(bps) / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_price_quote() {
        let q = quote(&CurveConfig::fixed_price(2), 3).unwrap();
        assert_eq!(q.unit_price, 2);
        assert_eq!(q.total, 6);
    }

    #[test]
    fn test_zero_price_quote() {
        let q = quote(&CurveConfig::fixed_price(0), 5).unwrap();
        assert_eq!(q.total, 0);
    }

    #[test]
    fn test_linear_term_with_zero_power_adds_constant() {
        let curve = CurveConfig::Exponential {
            c: 3,
            b: 2,
            pow: 0,
            frac: 1,
        };
        assert_eq!(quote(&curve, 2).unwrap().total, 10);
    }

    #[test]
    fn test_non_constant_curve_refused() {
        let curve = CurveConfig::Exponential {
            c: 1,
            b: 0,
            pow: 1,
            frac: 2,
        };
        assert!(matches!(
            quote(&curve, 1),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_overflow_is_invalid_input() {
        assert!(quote(&CurveConfig::fixed_price(u64::MAX), 2).is_err());
    }

    #[test]
    fn test_max_payment_default_slippage() {
        let q = quote(&CurveConfig::fixed_price(2), 3).unwrap();
        // floor(6 * 1.05) = 6
        assert_eq!(max_payment(&q, 0.05).unwrap(), 6);

        let q = quote(&CurveConfig::fixed_price(1_000), 10).unwrap();
        assert_eq!(max_payment(&q, 0.05).unwrap(), 10_500);
    }

    #[test]
    fn test_max_payment_never_below_quote() {
        let q = quote(&CurveConfig::fixed_price(7), 1).unwrap();
        assert_eq!(max_payment(&q, 0.0).unwrap(), 7);
        assert!(max_payment(&q, 0.999_999).unwrap() >= 7);
    }

    #[test]
    fn test_max_payment_saturates() {
        let q = quote(&CurveConfig::fixed_price(u64::MAX), 1).unwrap();
        assert_eq!(max_payment(&q, 0.5).unwrap(), u64::MAX);
    }

    #[test]
    fn test_slippage_bounds() {
        assert!(validate_slippage(0.0).is_ok());
        assert!(validate_slippage(0.05).is_ok());
        assert!(validate_slippage(1.0).is_err());
        assert!(validate_slippage(-0.01).is_err());
        assert!(validate_slippage(f64::NAN).is_err());
        assert!(validate_slippage(f64::INFINITY).is_err());
    }

    #[test]
    fn test_bps_conversion() {
        assert!((bps_to_fraction(500) - 0.05).abs() < f64::EPSILON);
    }
}
