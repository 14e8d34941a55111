//! Fee estimator: gas simulation, fee market, and fiat price fanned out
//! concurrently and joined all-or-nothing into a single consistent quote.

use num_bigint::BigUint;
use tracing::debug;

use crate::{
    asset::Asset,
    error::QuoteError,
    gateway::ChainGateway,
    oracle::PriceOracle,
    transfer::TransferRequest,
};

/// Up-front cost of one prospective transfer. Invalidated by any change to
/// the request; recompute instead of caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuote {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    /// `gas_limit * max_fee_per_gas`, exact.
    pub native_cost: BigUint,
    /// Fiat cost at the native asset's decimal scale:
    /// `floor(native_cost * price.mantissa / 10^price.precision)`. The one
    /// rounding step in the pipeline, a single final integer division.
    pub fiat_cost: BigUint,
}

/// Quote the cost of `request`. The three lookups are independent network
/// calls and run concurrently; if any fails the quote fails whole, since a
/// cost estimate missing a component is worse than none.
pub async fn quote<G, O>(
    gateway: &G,
    oracle: &O,
    native: &Asset,
    request: &TransferRequest,
) -> Result<FeeQuote, QuoteError>
where
    G: ChainGateway + ?Sized,
    O: PriceOracle + ?Sized,
{
    let (gas_limit, fees, price) = tokio::try_join!(
        async {
            gateway
                .estimate_transfer_gas(request)
                .await
                .map_err(QuoteError::Chain)
        },
        async { gateway.fee_parameters().await.map_err(QuoteError::Chain) },
        async { oracle.native_price(native).await.map_err(QuoteError::from) },
    )?;

    let native_cost = BigUint::from(gas_limit) * BigUint::from(fees.max_fee_per_gas);
    let fiat_cost = &native_cost * &price.mantissa / BigUint::from(10u32).pow(price.precision);

    debug!(
        gas_limit,
        max_fee_per_gas = fees.max_fee_per_gas,
        native_cost = %native_cost,
        fiat_cost = %fiat_cost,
        "computed fee quote"
    );

    Ok(FeeQuote {
        gas_limit,
        max_fee_per_gas: fees.max_fee_per_gas,
        native_cost,
        fiat_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, address};
    use async_trait::async_trait;

    use crate::{
        asset::AssetKind,
        error::{ChainError, PriceError},
        gateway::{FeeParameters, PendingHandle, Receipt},
        oracle::FiatPrice,
    };

    struct FakeGateway {
        gas: u64,
        max_fee_per_gas: u128,
    }

    #[async_trait]
    impl ChainGateway for FakeGateway {
        async fn native_balance(&self, _address: Address) -> Result<BigUint, ChainError> {
            unimplemented!("not exercised by quote tests")
        }

        async fn token_balance(
            &self,
            _contract: Address,
            _address: Address,
        ) -> Result<BigUint, ChainError> {
            unimplemented!("not exercised by quote tests")
        }

        async fn estimate_transfer_gas(
            &self,
            _request: &TransferRequest,
        ) -> Result<u64, ChainError> {
            Ok(self.gas)
        }

        async fn fee_parameters(&self) -> Result<FeeParameters, ChainError> {
            Ok(FeeParameters {
                max_fee_per_gas: self.max_fee_per_gas,
                max_priority_fee_per_gas: 1,
            })
        }

        async fn submit_transfer(
            &self,
            _request: &TransferRequest,
            _fees: &FeeParameters,
        ) -> Result<PendingHandle, ChainError> {
            unimplemented!("not exercised by quote tests")
        }

        async fn await_receipt(&self, _pending: PendingHandle) -> Result<Receipt, ChainError> {
            unimplemented!("not exercised by quote tests")
        }
    }

    struct FakeOracle {
        quote: Result<FiatPrice, PriceError>,
    }

    #[async_trait]
    impl PriceOracle for FakeOracle {
        async fn native_price(&self, _asset: &Asset) -> Result<FiatPrice, PriceError> {
            self.quote.clone()
        }
    }

    fn native_asset() -> Asset {
        Asset {
            id: "eth".to_string(),
            chain_id: 1,
            ticker: "ETH".to_string(),
            name: "Ether".to_string(),
            decimals: 18,
            kind: AssetKind::Native,
            price_id: Some("ethereum".to_string()),
            logo: None,
        }
    }

    fn request() -> TransferRequest {
        TransferRequest::new(
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            native_asset(),
            "1",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn native_and_fiat_costs_follow_the_integer_pipeline() {
        let gateway = FakeGateway {
            gas: 21_000,
            max_fee_per_gas: 50,
        };
        let oracle = FakeOracle {
            quote: FiatPrice::from_decimal_str("2000.00"),
        };

        let quote = quote(&gateway, &oracle, &native_asset(), &request())
            .await
            .unwrap();

        assert_eq!(quote.gas_limit, 21_000);
        assert_eq!(quote.max_fee_per_gas, 50);
        assert_eq!(quote.native_cost, BigUint::from(1_050_000u32));
        // 1_050_000 * 200_000 / 10^2, floored
        assert_eq!(quote.fiat_cost, BigUint::from(2_100_000_000u32));
    }

    #[tokio::test]
    async fn fiat_division_floors() {
        let gateway = FakeGateway {
            gas: 3,
            max_fee_per_gas: 1,
        };
        let oracle = FakeOracle {
            quote: FiatPrice::from_decimal_str("0.07"),
        };

        let quote = quote(&gateway, &oracle, &native_asset(), &request())
            .await
            .unwrap();

        // 3 * 7 / 100 = 0.21, floored to 0
        assert_eq!(quote.fiat_cost, BigUint::from(0u32));
    }

    #[tokio::test]
    async fn price_failure_fails_the_whole_quote() {
        let gateway = FakeGateway {
            gas: 21_000,
            max_fee_per_gas: 50,
        };
        let oracle = FakeOracle {
            quote: Err(PriceError::Unavailable("feed down".to_string())),
        };

        let err = quote(&gateway, &oracle, &native_asset(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::PriceUnavailable(_)));
    }

    #[tokio::test]
    async fn chain_failure_fails_the_whole_quote() {
        struct DownGateway;

        #[async_trait]
        impl ChainGateway for DownGateway {
            async fn native_balance(&self, _address: Address) -> Result<BigUint, ChainError> {
                unimplemented!()
            }
            async fn token_balance(
                &self,
                _contract: Address,
                _address: Address,
            ) -> Result<BigUint, ChainError> {
                unimplemented!()
            }
            async fn estimate_transfer_gas(
                &self,
                _request: &TransferRequest,
            ) -> Result<u64, ChainError> {
                Err(ChainError::Unavailable("rpc down".to_string()))
            }
            async fn fee_parameters(&self) -> Result<FeeParameters, ChainError> {
                Ok(FeeParameters {
                    max_fee_per_gas: 50,
                    max_priority_fee_per_gas: 1,
                })
            }
            async fn submit_transfer(
                &self,
                _request: &TransferRequest,
                _fees: &FeeParameters,
            ) -> Result<PendingHandle, ChainError> {
                unimplemented!()
            }
            async fn await_receipt(&self, _pending: PendingHandle) -> Result<Receipt, ChainError> {
                unimplemented!()
            }
        }

        let oracle = FakeOracle {
            quote: FiatPrice::from_decimal_str("2000.00"),
        };
        let err = quote(&DownGateway, &oracle, &native_asset(), &request())
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Chain(ChainError::Unavailable(_))));
    }
}
