use std::fmt;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{
    asset::{Asset, AssetKind, Registry, RegistryError},
    chain::Chain,
};

/// Process configuration: merged from `vesper.yaml` and `VESPER_`-prefixed
/// environment variables. Read-only to the engine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint for the chain.
    pub rpc_url: String,

    /// Hex private key of the account. Never logged.
    pub private_key: String,

    /// Bound on waiting for a transaction receipt.
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    /// Interval between receipt polls.
    #[serde(default = "default_receipt_poll_secs")]
    pub receipt_poll_secs: u64,

    pub price_feed: PriceFeedConfig,

    pub chain: ChainConfig,

    /// Declarative asset registry; validated by [`Config::registry`].
    pub assets: Vec<AssetConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    pub url: String,
    /// Demo API key for the feed. Never logged.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub id: u64,
    pub name: String,
    pub native_asset_id: String,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub decimals: u32,
    /// Contract address; absent for the native asset.
    pub address: Option<String>,
    /// Price feed identifier (e.g. "ethereum" on CoinGecko).
    pub price_id: Option<String>,
    pub logo: Option<String>,
}

fn default_receipt_timeout_secs() -> u64 {
    90
}

fn default_receipt_poll_secs() -> u64 {
    2
}

impl Config {
    /// Load configuration from environment and optional config file.
    pub fn load() -> Result<Self, figment::Error> {
        let config: Config = Figment::new()
            .merge(Yaml::file("vesper.yaml"))
            .merge(Env::prefixed("VESPER_"))
            .extract()?;

        Ok(config)
    }

    /// Turn the declarative chain + asset tables into a validated
    /// [`Registry`].
    pub fn registry(&self) -> Result<Registry, RegistryError> {
        let chain = Chain {
            id: self.chain.id,
            name: self.chain.name.clone(),
            native_asset_id: self.chain.native_asset_id.clone(),
            explorer_url: self.chain.explorer_url.clone(),
        };

        let assets = self
            .assets
            .iter()
            .map(|asset| {
                let kind = match &asset.address {
                    Some(address) => AssetKind::Token(address.parse().map_err(|_| {
                        RegistryError::InvalidAddress {
                            asset: asset.id.clone(),
                            address: address.clone(),
                        }
                    })?),
                    None => AssetKind::Native,
                };
                Ok(Asset {
                    id: asset.id.clone(),
                    chain_id: chain.id,
                    ticker: asset.ticker.clone(),
                    name: asset.name.clone(),
                    decimals: asset.decimals,
                    kind,
                    price_id: asset.price_id.clone(),
                    logo: asset.logo.clone(),
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;

        Registry::new(chain, assets)
    }
}

// Manual Debug so a dumped config can never leak the signer key or the
// feed credential.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("receipt_timeout_secs", &self.receipt_timeout_secs)
            .field("receipt_poll_secs", &self.receipt_poll_secs)
            .field("price_feed", &self.price_feed)
            .field("chain", &self.chain)
            .field("assets", &self.assets)
            .finish()
    }
}

impl fmt::Debug for PriceFeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceFeedConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
