use std::fmt::{self, Display};

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};

/// One chain, loaded once from config at process start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chain {
    pub id: u64,
    pub name: String,
    /// Registry id of the asset the chain denominates gas in.
    pub native_asset_id: String,
    /// Block explorer base, e.g. "https://etherscan.io/tx".
    pub explorer_url: String,
}

impl Chain {
    pub fn tx_url(&self, tx_hash: &TxHash) -> String {
        format!("{}/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={})", self.name, self.id)
    }
}
