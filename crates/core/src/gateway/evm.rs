use std::time::Duration;

use alloy::{
    network::TransactionBuilder as _,
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall as _,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::{debug, info};

use crate::{
    asset::AssetKind,
    error::ChainError,
    gateway::{ChainGateway, FeeParameters, PendingHandle, Receipt},
    transfer::TransferRequest,
};

// Taken from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/3790c59623e99cb0272ddf84e6a17a5979d06b35/contracts/token/ERC20/IERC20.sol
sol!(
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
    }
);

/// [`ChainGateway`] over an alloy provider. The provider is expected to
/// carry the account's signer (wallet filler), so `submit_transfer` signs
/// locally and broadcasts raw transactions.
pub struct EvmGateway<P> {
    provider: P,
    sender: Address,
    chain_id: u64,
    receipt_timeout: Duration,
    receipt_poll_interval: Duration,
}

impl<P: Provider + Clone> EvmGateway<P> {
    pub fn new(
        provider: P,
        sender: Address,
        chain_id: u64,
        receipt_timeout: Duration,
        receipt_poll_interval: Duration,
    ) -> Self {
        Self {
            provider,
            sender,
            chain_id,
            receipt_timeout,
            receipt_poll_interval,
        }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    /// One builder for both simulation and submission so the gas estimate
    /// prices exactly the transaction that will be broadcast.
    fn build_transfer(&self, request: &TransferRequest) -> Result<TransactionRequest, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_chain_id(self.chain_id);

        Ok(match request.asset.kind {
            AssetKind::Native => tx
                .with_to(request.to)
                .with_value(biguint_to_u256(&request.amount)?),
            AssetKind::Token(contract) => {
                let call = IERC20::transferCall {
                    to: request.to,
                    value: biguint_to_u256(&request.amount)?,
                };
                tx.with_to(contract).with_input(call.abi_encode())
            }
        })
    }
}

#[async_trait]
impl<P: Provider + Clone> ChainGateway for EvmGateway<P> {
    async fn native_balance(&self, address: Address) -> Result<BigUint, ChainError> {
        let balance = self
            .provider
            .get_balance(address)
            .await
            .map_err(map_rpc_error)?;
        Ok(u256_to_biguint(balance))
    }

    async fn token_balance(
        &self,
        contract: Address,
        address: Address,
    ) -> Result<BigUint, ChainError> {
        let token = IERC20::new(contract, self.provider.clone());
        let balance = token
            .balanceOf(address)
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(u256_to_biguint(balance))
    }

    async fn estimate_transfer_gas(&self, request: &TransferRequest) -> Result<u64, ChainError> {
        let tx = self.build_transfer(request)?;
        let gas = self.provider.estimate_gas(tx).await.map_err(map_rpc_error)?;
        debug!(gas, asset = %request.asset.id, "estimated transfer gas");
        Ok(gas)
    }

    async fn fee_parameters(&self) -> Result<FeeParameters, ChainError> {
        let estimate = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(map_rpc_error)?;
        Ok(FeeParameters {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }

    async fn submit_transfer(
        &self,
        request: &TransferRequest,
        fees: &FeeParameters,
    ) -> Result<PendingHandle, ChainError> {
        let tx = self
            .build_transfer(request)?
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(map_rpc_error)?;

        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, asset = %request.asset.id, "transfer broadcast");
        Ok(PendingHandle { tx_hash })
    }

    async fn await_receipt(&self, pending: PendingHandle) -> Result<Receipt, ChainError> {
        let poll = async {
            loop {
                match self
                    .provider
                    .get_transaction_receipt(pending.tx_hash)
                    .await
                {
                    Ok(Some(receipt)) => {
                        break Ok(Receipt {
                            included: true,
                            status_success: receipt.status(),
                            tx_hash: receipt.transaction_hash,
                        });
                    }
                    Ok(None) => tokio::time::sleep(self.receipt_poll_interval).await,
                    Err(err) => break Err(map_rpc_error(err)),
                }
            }
        };

        match tokio::time::timeout(self.receipt_timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout),
        }
    }
}

fn u256_to_biguint(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32usize>())
}

fn biguint_to_u256(value: &BigUint) -> Result<U256, ChainError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(ChainError::Rejected(
            "amount does not fit in 256 bits".to_string(),
        ));
    }
    Ok(U256::from_be_slice(&bytes))
}

/// Error responses are the node refusing the call; everything else is
/// transport trouble and retryable.
fn map_rpc_error(err: RpcError<TransportErrorKind>) -> ChainError {
    match err {
        RpcError::ErrorResp(payload) => ChainError::Rejected(payload.to_string()),
        other => ChainError::Unavailable(other.to_string()),
    }
}

fn map_contract_error(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(err) => map_rpc_error(err),
        other => ChainError::Rejected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_round_trips_through_biguint() {
        let value = U256::from(10u128.pow(18) * 3);
        let big = u256_to_biguint(value);
        assert_eq!(biguint_to_u256(&big).unwrap(), value);
    }

    #[test]
    fn oversized_amount_is_rejected() {
        let too_big = BigUint::from(1u8) << 256;
        assert!(matches!(
            biguint_to_u256(&too_big),
            Err(ChainError::Rejected(_))
        ));
    }
}
