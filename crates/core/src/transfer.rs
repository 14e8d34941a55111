//! Transfer execution: one request, one spawned worker, a stream of
//! lifecycle states ending in exactly one terminal outcome.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use futures::Stream;
use num_bigint::BigUint;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    asset::Asset,
    error::ChainError,
    gateway::ChainGateway,
    money::{self, MoneyError},
};

/// One prospective transfer. The amount is parsed from user input exactly
/// once, here; downstream code only ever sees the smallest-unit integer.
/// Build a fresh request for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to: Address,
    pub asset: Asset,
    pub amount: BigUint,
}

impl TransferRequest {
    pub fn new(to: Address, asset: Asset, decimal_amount: &str) -> Result<Self, MoneyError> {
        let amount = money::parse_decimal(decimal_amount, asset.decimals)?;
        Ok(Self { to, asset, amount })
    }
}

/// Why a transfer invocation ended without confirmation.
///
/// `SubmissionRejected` and `TransportError` mean the broadcast itself did
/// not happen (no chain record; safe to retry with a fresh request).
/// `TimedOut` means the transaction *was* broadcast and its outcome is
/// undetermined; it may still confirm, so callers must re-check balances
/// rather than assume failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    SubmissionRejected(String),
    TransportError(String),
    TimedOut,
}

/// Lifecycle states observable by the caller: `Pending` the instant the
/// broadcast succeeds, then exactly one of the terminal states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Pending(TxHash),
    Confirmed(TxHash),
    /// Mined but execution reverted: gas is spent, principal did not move.
    Reverted(TxHash),
    Failed(TransferFailure),
}

impl TransferOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferOutcome::Pending(_))
    }
}

/// Drives one transfer at a time through the gateway. No retries live
/// here: resubmitting a transfer that may already be pending consumes
/// nonce capacity and must never happen silently.
pub struct Executor<G> {
    gateway: Arc<G>,
}

impl<G> Executor<G>
where
    G: ChainGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Submit `request` and stream its lifecycle. The worker runs detached:
    /// dropping the stream abandons the local wait, never the broadcast
    /// (chains have no cancel).
    pub fn execute(&self, request: TransferRequest) -> impl Stream<Item = TransferOutcome> {
        let (outcomes_tx, outcomes_rx) = mpsc::channel(4);
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(run_transfer(gateway, request, outcomes_tx));
        ReceiverStream::new(outcomes_rx)
    }
}

async fn run_transfer<G>(
    gateway: Arc<G>,
    request: TransferRequest,
    outcomes: mpsc::Sender<TransferOutcome>,
) where
    G: ChainGateway + ?Sized,
{
    // Fee parameters are re-read at submission time; a quote taken earlier
    // may be stale and re-quoting is the caller's call, not ours.
    let fees = match gateway.fee_parameters().await {
        Ok(fees) => fees,
        Err(err) => {
            let _ = outcomes
                .send(TransferOutcome::Failed(submission_failure(err)))
                .await;
            return;
        }
    };

    let pending = match gateway.submit_transfer(&request, &fees).await {
        Ok(pending) => pending,
        Err(err) => {
            warn!(asset = %request.asset.id, error = %err, "transfer submission failed");
            let _ = outcomes
                .send(TransferOutcome::Failed(submission_failure(err)))
                .await;
            return;
        }
    };

    let _ = outcomes
        .send(TransferOutcome::Pending(pending.tx_hash))
        .await;

    // Past this point a chain record exists. Any failure to observe the
    // receipt is "outcome undetermined", never "did not happen".
    let outcome = match gateway.await_receipt(pending).await {
        Ok(receipt) if receipt.included && receipt.status_success => {
            info!(tx_hash = %receipt.tx_hash, "transfer confirmed");
            TransferOutcome::Confirmed(receipt.tx_hash)
        }
        Ok(receipt) if receipt.included => {
            warn!(tx_hash = %receipt.tx_hash, "transfer mined but reverted");
            TransferOutcome::Reverted(receipt.tx_hash)
        }
        Ok(_) => TransferOutcome::Failed(TransferFailure::TimedOut),
        Err(err) => {
            warn!(tx_hash = %pending.tx_hash, error = %err, "receipt not observed within bound");
            TransferOutcome::Failed(TransferFailure::TimedOut)
        }
    };

    let _ = outcomes.send(outcome).await;
}

/// Mapping for failures *before* broadcast only.
fn submission_failure(err: ChainError) -> TransferFailure {
    match err {
        ChainError::Rejected(reason) => TransferFailure::SubmissionRejected(reason),
        ChainError::Unavailable(reason) => TransferFailure::TransportError(reason),
        ChainError::Timeout => {
            TransferFailure::TransportError("timed out before broadcast".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};
    use async_trait::async_trait;
    use futures::StreamExt as _;

    use crate::{
        asset::AssetKind,
        gateway::{FeeParameters, PendingHandle, Receipt},
    };

    fn tx_hash() -> TxHash {
        b256!("0x2222222222222222222222222222222222222222222222222222222222222222")
    }

    /// Gateway with scripted submit/receipt behavior.
    struct ScriptedGateway {
        submit: Result<PendingHandle, ChainError>,
        receipt: Result<Receipt, ChainError>,
    }

    #[async_trait]
    impl ChainGateway for ScriptedGateway {
        async fn native_balance(&self, _address: Address) -> Result<BigUint, ChainError> {
            unimplemented!("not exercised by executor tests")
        }

        async fn token_balance(
            &self,
            _contract: Address,
            _address: Address,
        ) -> Result<BigUint, ChainError> {
            unimplemented!("not exercised by executor tests")
        }

        async fn estimate_transfer_gas(
            &self,
            _request: &TransferRequest,
        ) -> Result<u64, ChainError> {
            unimplemented!("not exercised by executor tests")
        }

        async fn fee_parameters(&self) -> Result<FeeParameters, ChainError> {
            Ok(FeeParameters {
                max_fee_per_gas: 50,
                max_priority_fee_per_gas: 2,
            })
        }

        async fn submit_transfer(
            &self,
            _request: &TransferRequest,
            _fees: &FeeParameters,
        ) -> Result<PendingHandle, ChainError> {
            self.submit.clone()
        }

        async fn await_receipt(&self, _pending: PendingHandle) -> Result<Receipt, ChainError> {
            self.receipt.clone()
        }
    }

    fn request() -> TransferRequest {
        let asset = Asset {
            id: "eth".to_string(),
            chain_id: 1,
            ticker: "ETH".to_string(),
            name: "Ether".to_string(),
            decimals: 18,
            kind: AssetKind::Native,
            price_id: Some("ethereum".to_string()),
            logo: None,
        };
        TransferRequest::new(
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            asset,
            "1",
        )
        .unwrap()
    }

    async fn run(gateway: ScriptedGateway) -> Vec<TransferOutcome> {
        Executor::new(Arc::new(gateway))
            .execute(request())
            .collect()
            .await
    }

    #[tokio::test]
    async fn confirmed_when_mined_with_success_status() {
        let outcomes = run(ScriptedGateway {
            submit: Ok(PendingHandle { tx_hash: tx_hash() }),
            receipt: Ok(Receipt {
                included: true,
                status_success: true,
                tx_hash: tx_hash(),
            }),
        })
        .await;

        assert_eq!(
            outcomes,
            vec![
                TransferOutcome::Pending(tx_hash()),
                TransferOutcome::Confirmed(tx_hash()),
            ]
        );
    }

    #[tokio::test]
    async fn reverted_when_mined_with_failure_status() {
        let outcomes = run(ScriptedGateway {
            submit: Ok(PendingHandle { tx_hash: tx_hash() }),
            receipt: Ok(Receipt {
                included: true,
                status_success: false,
                tx_hash: tx_hash(),
            }),
        })
        .await;

        assert_eq!(
            outcomes,
            vec![
                TransferOutcome::Pending(tx_hash()),
                TransferOutcome::Reverted(tx_hash()),
            ]
        );
    }

    #[tokio::test]
    async fn receipt_timeout_is_unresolved_not_a_submission_failure() {
        let outcomes = run(ScriptedGateway {
            submit: Ok(PendingHandle { tx_hash: tx_hash() }),
            receipt: Err(ChainError::Timeout),
        })
        .await;

        assert_eq!(
            outcomes,
            vec![
                TransferOutcome::Pending(tx_hash()),
                TransferOutcome::Failed(TransferFailure::TimedOut),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_broadcast_never_reaches_pending() {
        let outcomes = run(ScriptedGateway {
            submit: Err(ChainError::Rejected("insufficient funds".to_string())),
            receipt: Err(ChainError::Timeout),
        })
        .await;

        assert_eq!(
            outcomes,
            vec![TransferOutcome::Failed(TransferFailure::SubmissionRejected(
                "insufficient funds".to_string()
            ))]
        );
    }

    #[tokio::test]
    async fn transport_fault_before_broadcast_is_retryable_failure() {
        let outcomes = run(ScriptedGateway {
            submit: Err(ChainError::Unavailable("rpc down".to_string())),
            receipt: Err(ChainError::Timeout),
        })
        .await;

        assert_eq!(
            outcomes,
            vec![TransferOutcome::Failed(TransferFailure::TransportError(
                "rpc down".to_string()
            ))]
        );
    }

    #[tokio::test]
    async fn transport_fault_after_broadcast_is_unresolved() {
        let outcomes = run(ScriptedGateway {
            submit: Ok(PendingHandle { tx_hash: tx_hash() }),
            receipt: Err(ChainError::Unavailable("connection dropped".to_string())),
        })
        .await;

        assert_eq!(
            outcomes,
            vec![
                TransferOutcome::Pending(tx_hash()),
                TransferOutcome::Failed(TransferFailure::TimedOut),
            ]
        );
    }

    #[test]
    fn request_amount_is_parsed_once_through_the_codec() {
        let request = request();
        assert_eq!(request.amount, BigUint::from(10u128.pow(18)));

        let asset = request.asset.clone();
        assert!(TransferRequest::new(request.to, asset, "1.0000000000000000001").is_err());
    }
}
