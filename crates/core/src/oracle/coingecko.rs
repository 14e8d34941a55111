use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{
    asset::Asset,
    error::PriceError,
    oracle::{FiatPrice, PriceOracle},
};

/// CoinGecko `simple/price` adapter. The response is read with
/// `serde_json`'s arbitrary-precision numbers so the quoted decimal reaches
/// [`FiatPrice`] as its literal digits, not as an f64.
pub struct CoinGecko {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CoinGecko {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PriceOracle for CoinGecko {
    async fn native_price(&self, asset: &Asset) -> Result<FiatPrice, PriceError> {
        let id = asset.price_id.as_deref().ok_or_else(|| {
            PriceError::Malformed(format!("asset {:?} has no price feed id", asset.id))
        })?;

        let url = format!("{}/simple/price", self.base_url.trim_end_matches('/'));
        let body: Value = self
            .http
            .get(&url)
            .query(&[
                ("ids", id),
                ("vs_currencies", "usd"),
                ("x_cg_demo_api_key", &self.api_key),
            ])
            .send()
            .await
            .map_err(|err| PriceError::Unavailable(err.to_string()))?
            .error_for_status()
            .map_err(|err| PriceError::Unavailable(err.to_string()))?
            .json()
            .await
            .map_err(|err| PriceError::Unavailable(err.to_string()))?;

        let quoted = match body.get(id).and_then(|entry| entry.get("usd")) {
            Some(Value::Number(quote)) => quote.to_string(),
            _ => {
                return Err(PriceError::Malformed(format!(
                    "feed response has no usd quote for {id:?}"
                )));
            }
        };

        let price = FiatPrice::from_decimal_str(&quoted)?;
        debug!(asset = %asset.id, mantissa = %price.mantissa, precision = price.precision, "fetched fiat price");
        Ok(price)
    }
}
