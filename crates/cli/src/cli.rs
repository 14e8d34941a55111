use std::{
    io::{self, BufRead as _, Write as _},
    sync::Arc,
    time::Duration,
};

use alloy::{
    network::EthereumWallet, primitives::Address, providers::ProviderBuilder,
    signers::local::PrivateKeySigner,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, Context as _, eyre};
use futures::StreamExt as _;
use tracing::info;

use vesper_core::{
    asset::{Asset, Registry},
    config::Config,
    gateway::{ChainGateway, EvmGateway},
    money,
    oracle::{CoinGecko, PriceOracle},
    quote::{self, FeeQuote},
    sync,
    transfer::{Executor, TransferFailure, TransferOutcome, TransferRequest},
};

#[derive(Parser)]
#[command(name = "vesper", about)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct TransferArgs {
    /// Ticker of the asset to move, e.g. ETH or DAI
    #[arg(long)]
    asset: String,

    /// Recipient address
    #[arg(long)]
    to: String,

    /// Amount in whole units, e.g. "1.5"
    #[arg(long)]
    amount: String,
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct SendArgs {
    #[command(flatten)]
    transfer: TransferArgs,

    /// Broadcast without the interactive confirmation prompt
    #[arg(long)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show native and token balances for the configured account
    Balances,

    /// Estimate the cost of a transfer without sending it
    Quote(TransferArgs),

    /// Send a transfer and follow it to a terminal state
    Send(SendArgs),
}

impl Cli {
    pub(crate) async fn run(self, config: Config) -> eyre::Result<()> {
        let registry = config.registry().wrap_err("invalid asset registry")?;

        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .wrap_err("failed to parse private key")?;
        let sender = signer.address();
        let wallet = EthereumWallet::new(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(config.rpc_url.parse().wrap_err("failed to parse RPC URL")?);

        let gateway = Arc::new(EvmGateway::new(
            provider,
            sender,
            registry.chain().id,
            Duration::from_secs(config.receipt_timeout_secs),
            Duration::from_secs(config.receipt_poll_secs),
        ));
        let oracle = CoinGecko::new(&config.price_feed.url, &config.price_feed.api_key);

        info!(chain = %registry.chain(), account = %sender, "wallet ready");

        match self.command {
            Commands::Balances => print_balances(gateway.as_ref(), sender, &registry).await,
            Commands::Quote(args) => {
                let request = build_request(&registry, &args)?;
                let quote =
                    quote::quote(gateway.as_ref(), &oracle, registry.native(), &request).await?;
                println!("{}", fee_line(&quote, registry.native()));
                Ok(())
            }
            Commands::Send(args) => {
                let request = build_request(&registry, &args.transfer)?;
                send(gateway, &oracle, sender, &registry, request, args.yes).await
            }
        }
    }
}

fn build_request(registry: &Registry, args: &TransferArgs) -> eyre::Result<TransferRequest> {
    let asset = registry
        .by_ticker(&args.asset)
        .ok_or_else(|| eyre!("unknown asset {:?}", args.asset))?;
    let to: Address = args.to.parse().wrap_err("invalid recipient address")?;
    TransferRequest::new(to, asset.clone(), &args.amount).wrap_err("invalid amount")
}

/// Fee string shown before confirmation: "<fiat> USD (<native> <ticker>)".
fn fee_line(quote: &FeeQuote, native: &Asset) -> String {
    format!(
        "Transaction fee: {} USD ({} {})",
        money::format_units(&quote.fiat_cost, native.decimals),
        money::format_units(&quote.native_cost, native.decimals),
        native.ticker,
    )
}

async fn print_balances<G>(gateway: &G, account: Address, registry: &Registry) -> eyre::Result<()>
where
    G: ChainGateway + ?Sized,
{
    let assets: Vec<Asset> = registry.all().cloned().collect();
    let snapshot = sync::refresh(gateway, account, &assets).await;

    println!("Account {account}");
    for asset in &assets {
        match snapshot.get(&asset.id) {
            Some(Ok(balance)) => println!(
                "  {:>6}  {}",
                asset.ticker,
                money::format_units(&balance.amount, asset.decimals)
            ),
            Some(Err(err)) => println!("  {:>6}  unavailable ({err})", asset.ticker),
            None => {}
        }
    }
    Ok(())
}

async fn send<G, O>(
    gateway: Arc<G>,
    oracle: &O,
    sender: Address,
    registry: &Registry,
    request: TransferRequest,
    assume_yes: bool,
) -> eyre::Result<()>
where
    G: ChainGateway + 'static,
    O: PriceOracle + ?Sized,
{
    // Quote first so the user confirms against a full cost estimate; a
    // partial quote is never shown.
    let quote = quote::quote(gateway.as_ref(), oracle, registry.native(), &request).await?;
    println!(
        "Sending {} {} to {}",
        money::format_units(&request.amount, request.asset.decimals),
        request.asset.ticker,
        request.to,
    );
    println!("{}", fee_line(&quote, registry.native()));

    if !assume_yes {
        print!("Proceed? [y/N] ");
        io::stdout().flush().wrap_err("failed to flush stdout")?;
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .wrap_err("failed to read confirmation")?;
        if !affirmative(&answer) {
            println!("Aborted, nothing was sent.");
            return Ok(());
        }
    }

    let executor = Executor::new(Arc::clone(&gateway));
    let mut outcomes = executor.execute(request);

    // Balances are stale after anything that may have landed on-chain.
    let mut recheck_balances = false;
    while let Some(outcome) = outcomes.next().await {
        match outcome {
            TransferOutcome::Pending(tx_hash) => {
                println!("Broadcast, waiting for inclusion: {tx_hash}");
            }
            TransferOutcome::Confirmed(tx_hash) => {
                println!("Transfer successful: {}", registry.chain().tx_url(&tx_hash));
                recheck_balances = true;
            }
            TransferOutcome::Reverted(tx_hash) => {
                println!(
                    "Transfer reverted on-chain, gas was spent but the principal did not move: {}",
                    registry.chain().tx_url(&tx_hash)
                );
                recheck_balances = true;
            }
            TransferOutcome::Failed(TransferFailure::TimedOut) => {
                println!(
                    "No receipt within the configured bound. The transfer may still confirm; \
                     re-check balances before trying again."
                );
                recheck_balances = true;
            }
            TransferOutcome::Failed(TransferFailure::SubmissionRejected(reason)) => {
                println!("Submission rejected by the node: {reason}");
            }
            TransferOutcome::Failed(TransferFailure::TransportError(reason)) => {
                println!("Could not reach the chain: {reason}. Safe to retry.");
            }
        }
    }

    if recheck_balances {
        print_balances(gateway.as_ref(), sender, registry).await?;
    }
    Ok(())
}

/// Only an explicit yes broadcasts; anything else aborts.
fn affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_requires_explicit_yes() {
        for yes in ["y", "Y", "yes", "YES", " y \n"] {
            assert!(affirmative(yes), "{yes:?} should confirm");
        }
        for no in ["", "\n", "n", "no", "N", "maybe", "yep"] {
            assert!(!affirmative(no), "{no:?} should abort");
        }
    }
}
