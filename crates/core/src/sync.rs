//! Balance synchronizer: one concurrent query per asset, per-item failure.
//!
//! A missing single balance is a display nuisance, not a money-safety
//! issue, so the snapshot carries per-asset results instead of failing as
//! a whole. Callers replace their view wholesale; nothing is merged.

use alloy::primitives::Address;
use futures::future;
use num_bigint::BigUint;
use tracing::warn;

use crate::{
    asset::{Asset, AssetKind},
    error::ChainError,
    gateway::ChainGateway,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub asset_id: String,
    pub amount: BigUint,
}

/// Point-in-time view of every queried asset, in query order.
#[derive(Debug)]
pub struct BalanceSnapshot {
    entries: Vec<(String, Result<Balance, ChainError>)>,
}

impl BalanceSnapshot {
    pub fn get(&self, asset_id: &str) -> Option<&Result<Balance, ChainError>> {
        self.entries
            .iter()
            .find(|(id, _)| id == asset_id)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<Balance, ChainError>)> {
        self.entries
            .iter()
            .map(|(id, result)| (id.as_str(), result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Refresh every asset's balance for `address` concurrently.
pub async fn refresh<G>(gateway: &G, address: Address, assets: &[Asset]) -> BalanceSnapshot
where
    G: ChainGateway + ?Sized,
{
    let queries = assets.iter().map(|asset| async move {
        let result = match asset.kind {
            AssetKind::Native => gateway.native_balance(address).await,
            AssetKind::Token(contract) => gateway.token_balance(contract, address).await,
        };

        if let Err(err) = &result {
            warn!(asset = %asset.id, error = %err, "balance query failed");
        }

        let result = result.map(|amount| Balance {
            asset_id: asset.id.clone(),
            amount,
        });
        (asset.id.clone(), result)
    });

    BalanceSnapshot {
        entries: future::join_all(queries).await,
    }
}
