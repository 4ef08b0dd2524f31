//! Provernet request harness.
//!
//! Runs one execution request end to end — locate the image, build and
//! submit the request, watch for a claim — against an in-memory ledger with
//! a simulated prover, and prints the transaction signature and the final
//! claim observation. Ctrl-C during the watch exercises cancellation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use provernet_sdk::prelude::*;
use provernet_sdk::testing::MockLedger;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "provernet")]
#[command(about = "Submit one execution request to the prover network and watch for a claim")]
struct Cli {
    /// Image id of the registered computation (64 hex chars)
    #[arg(long, env = "IMAGE_ID")]
    image_id: String,

    /// Input text handed to the prover
    #[arg(long, default_value = "Hello, World!")]
    input: String,

    /// Prover incentive
    #[arg(long, default_value_t = 12_000)]
    tip: u64,

    /// Slots until the request can no longer be claimed
    #[arg(long, default_value_t = 2_000)]
    expiry_offset: u64,

    /// Seconds between claim polls
    #[arg(long, default_value_t = 1.0)]
    poll_interval_secs: f64,

    /// Seconds to wait for a claim before giving up
    #[arg(long, default_value_t = 60.0)]
    timeout_secs: f64,

    /// Simulated prover claim delay in seconds (0 = never claims)
    #[arg(long, default_value_t = 3.0)]
    claim_after_secs: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let image = ImageId::from_hex(&cli.image_id).context("parsing --image-id")?;

    // demo environment: in-memory ledger, registered image, funded payer
    let mock = Arc::new(MockLedger::new());
    let program = Address([0xb0; 32]);
    let payer = SigningIdentity::generate();
    mock.register_image(&image, &program);
    mock.fund(payer.address(), 100_000_000_000);

    println!("Payer: {}", payer.address());

    if cli.claim_after_secs > 0.0 {
        let prover = mock.clone();
        let delay = Duration::from_secs_f64(cli.claim_after_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            loop {
                if let Some(account) = prover.claim_first_unclaimed(&program) {
                    info!("simulated prover claimed {}", account);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        });
    } else {
        warn!("simulated prover disabled; the watch will run to its timeout");
    }

    let (cancel_handle, cancel_signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling watch");
            cancel_handle.cancel();
        }
    });

    let config = ClientConfig {
        poll_interval: Duration::from_secs_f64(cli.poll_interval_secs),
        watch_timeout: Duration::from_secs_f64(cli.timeout_secs),
        ..ClientConfig::default()
    };

    let ledger: Arc<dyn Ledger> = mock;
    let session = RequestSession::new(ledger, program, payer, config);
    let outcome = session
        .run(
            &image,
            InputPayload::Inline(cli.input.into_bytes()),
            SessionParams {
                tip: cli.tip,
                expiry_offset: cli.expiry_offset,
                callback_program: program,
            },
            Some(cancel_signal),
        )
        .await?;

    println!("Request account: {}", outcome.account);
    println!("Transaction signature: {}", outcome.signature);
    match outcome.resolution {
        Resolution::ClaimedOrFulfilled(observation) => {
            println!(
                "Claimed or fulfilled: data length {} bytes (account exists: {})",
                observation.data_len, observation.account_exists
            );
        }
        Resolution::Expired { expiry_slot } => {
            println!("Expired unclaimed at slot {expiry_slot}");
        }
        Resolution::WatchTimedOut { waited } => {
            println!("Still unclaimed after {waited:?}; it may be claimed later");
        }
        Resolution::Cancelled => {
            println!("Watch cancelled");
        }
    }

    Ok(())
}
