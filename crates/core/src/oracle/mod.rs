//! Fiat price lookup for the native asset.

use async_trait::async_trait;
use num_bigint::BigUint;

use crate::{asset::Asset, error::PriceError, money};

pub use coingecko::CoinGecko;
mod coingecko;

/// A fiat price as the feed quoted it: integer mantissa plus the number of
/// fractional digits the feed used. `"2000.05"` becomes
/// `{ mantissa: 200005, precision: 2 }`. The precision is read from the
/// quote itself, never assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiatPrice {
    pub mantissa: BigUint,
    pub precision: u32,
}

impl FiatPrice {
    pub fn from_decimal_str(quoted: &str) -> Result<Self, PriceError> {
        let precision = quoted
            .split_once('.')
            .map(|(_, frac)| frac.len() as u32)
            .unwrap_or(0);
        let mantissa = money::parse_decimal(quoted, precision)
            .map_err(|err| PriceError::Malformed(err.to_string()))?;
        Ok(Self { mantissa, precision })
    }
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn native_price(&self, asset: &Asset) -> Result<FiatPrice, PriceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_precision_from_the_quote() {
        let price = FiatPrice::from_decimal_str("2000.00").unwrap();
        assert_eq!(price.mantissa, BigUint::from(200_000u32));
        assert_eq!(price.precision, 2);

        let price = FiatPrice::from_decimal_str("1875.3942").unwrap();
        assert_eq!(price.mantissa, BigUint::from(18_753_942u32));
        assert_eq!(price.precision, 4);

        let price = FiatPrice::from_decimal_str("42").unwrap();
        assert_eq!(price.mantissa, BigUint::from(42u32));
        assert_eq!(price.precision, 0);
    }

    #[test]
    fn rejects_non_decimal_quotes() {
        assert!(FiatPrice::from_decimal_str("2e3").is_err());
        assert!(FiatPrice::from_decimal_str("").is_err());
        assert!(FiatPrice::from_decimal_str("-5").is_err());
    }
}
