//! Read/write access to the chain, abstracted so the engine can be driven
//! by a fake in tests and by an alloy provider in production.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use num_bigint::BigUint;

use crate::{error::ChainError, transfer::TransferRequest};

pub use evm::EvmGateway;
mod evm;

/// Fee-market parameters at call time. Callers must not assume stability
/// across calls; a quote and a later submission may see different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParameters {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Proof that a transfer was broadcast. Holding one means the transaction
/// exists on the network even if this process never observes its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingHandle {
    pub tx_hash: TxHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub included: bool,
    pub status_success: bool,
    pub tx_hash: TxHash,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn native_balance(&self, address: Address) -> Result<BigUint, ChainError>;

    async fn token_balance(
        &self,
        contract: Address,
        address: Address,
    ) -> Result<BigUint, ChainError>;

    /// Simulate the transfer without mutating chain state.
    async fn estimate_transfer_gas(&self, request: &TransferRequest) -> Result<u64, ChainError>;

    async fn fee_parameters(&self) -> Result<FeeParameters, ChainError>;

    /// Sign and broadcast. Returns at broadcast, not at inclusion.
    async fn submit_transfer(
        &self,
        request: &TransferRequest,
        fees: &FeeParameters,
    ) -> Result<PendingHandle, ChainError>;

    /// Suspend until the transaction is mined or a bounded timeout elapses
    /// (`ChainError::Timeout`).
    async fn await_receipt(&self, pending: PendingHandle) -> Result<Receipt, ChainError>;
}
