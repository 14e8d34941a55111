use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::Chain;

/// Native coin or ERC-20 token. The JS-era "asset is native iff it lacks a
/// contract address" check is an explicit tag here; every consumer matches
/// exhaustively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetKind {
    Native,
    Token(Address),
}

/// Immutable asset record from the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub chain_id: u64,
    pub ticker: String,
    pub name: String,
    /// Fractional digits of the smallest-unit representation.
    pub decimals: u32,
    pub kind: AssetKind,
    /// Identifier the fiat price feed knows this asset by.
    pub price_id: Option<String>,
    pub logo: Option<String>,
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self.kind, AssetKind::Native)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("native asset {0:?} not found in asset list")]
    MissingNative(String),

    #[error("asset {0:?} is designated native but carries a contract address")]
    NativeHasContract(String),

    #[error("asset {0:?} has no contract address and is not the native asset")]
    MissingContract(String),

    #[error("asset {asset:?} has invalid contract address {address:?}")]
    InvalidAddress { asset: String, address: String },

    #[error("duplicate asset id {0:?}")]
    Duplicate(String),
}

/// Static view of one chain and its assets. No behavior beyond lookup.
#[derive(Debug, Clone)]
pub struct Registry {
    chain: Chain,
    native: Asset,
    tokens: Vec<Asset>,
}

impl Registry {
    /// Build and validate the registry: exactly one native asset, matching
    /// the chain's `native_asset_id`, every other entry a token.
    pub fn new(chain: Chain, assets: Vec<Asset>) -> Result<Self, RegistryError> {
        let mut native = None;
        let mut tokens = Vec::new();

        for asset in assets {
            if Some(&asset.id) == native.as_ref().map(|a: &Asset| &a.id)
                || tokens.iter().any(|t: &Asset| t.id == asset.id)
            {
                return Err(RegistryError::Duplicate(asset.id));
            }

            if asset.id == chain.native_asset_id {
                match asset.kind {
                    AssetKind::Native => native = Some(asset),
                    AssetKind::Token(_) => {
                        return Err(RegistryError::NativeHasContract(asset.id));
                    }
                }
            } else {
                match asset.kind {
                    AssetKind::Token(_) => tokens.push(asset),
                    AssetKind::Native => {
                        return Err(RegistryError::MissingContract(asset.id));
                    }
                }
            }
        }

        let native =
            native.ok_or_else(|| RegistryError::MissingNative(chain.native_asset_id.clone()))?;

        Ok(Self {
            chain,
            native,
            tokens,
        })
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn native(&self) -> &Asset {
        &self.native
    }

    pub fn tokens(&self) -> &[Asset] {
        &self.tokens
    }

    /// Native first, then tokens in registry order.
    pub fn all(&self) -> impl Iterator<Item = &Asset> {
        std::iter::once(&self.native).chain(self.tokens.iter())
    }

    pub fn by_ticker(&self, ticker: &str) -> Option<&Asset> {
        self.all()
            .find(|asset| asset.ticker.eq_ignore_ascii_case(ticker))
    }
}
