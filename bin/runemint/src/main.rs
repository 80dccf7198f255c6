//! Rune mint client.
//!
//! Loads config, registers the funding address as a watch-only
//! descriptor with the node, then drives the mint loop until the
//! requested number of mints complete or the wallet runs dry.

mod args;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use args::Args;
use bitcoin::Amount;
use runemint_builder::{KeySpendBuilder, OrdinalsEncoder};
use runemint_config::Config;
use runemint_minter::{
    escalate::EscalationPolicy,
    fee::{CachingFeeOracle, MempoolEndpoint},
    run_mint_loop,
    watch::{ensure_wallet, ensure_watched},
    MintContext, StopReason,
};
use runemint_rpc::BitcoindClient;
use tokio::sync::watch;
use tracing::*;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args).await {
        eprintln!("FATAL ERROR: {e:#}");

        return Err(e);
    }

    Ok(())
}

async fn main_inner(args: Args) -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    let (rune_spec, count) = resolve_mint_params(&args, &config)?;

    let key = config.signing_key().context("deriving signing key")?;
    let address = key.address().to_string();
    info!(%address, network = %config.network, "funding address derived");

    let mut client = BitcoindClient::new(&config.rpc_url);
    if let (Some(user), Some(password)) = (&config.rpc_user, &config.rpc_password) {
        client = client.with_auth(user, password);
    }

    ensure_wallet(&client, &config.wallet_name)
        .await
        .context("preparing watch wallet")?;
    let client = client.with_wallet(&config.wallet_name);
    ensure_watched(&client, &address)
        .await
        .context("registering address descriptor")?;

    let encoder = OrdinalsEncoder::new(&rune_spec)
        .with_context(|| format!("parsing rune id {rune_spec:?}"))?;
    let builder = KeySpendBuilder::new(key.keypair(), key.network());
    let oracle = CachingFeeOracle::new(MempoolEndpoint::new(&config.fee_endpoint));

    let ctx = MintContext {
        rpc: Arc::new(client),
        fees: Arc::new(oracle),
        builder: Arc::new(builder),
        encoder: Arc::new(encoder),
        policy: EscalationPolicy {
            package_limit: config.package_limit,
            auto_speedup: config.auto_speedup,
        },
        funding_address: key.address().clone(),
        postage: Amount::from_sat(config.postage_sats),
        fee_override: args
            .fee_rate
            .or((config.fee_per_vbyte > 0).then_some(config.fee_per_vbyte)),
        speed_fee_override: (config.speed_fee_per_vbyte > 0).then_some(config.speed_fee_per_vbyte),
        settle_delay: Duration::from_secs(config.settle_delay_secs),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing current broadcast");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(rune = %rune_spec, %count, "starting mint run");
    let outcome = run_mint_loop(&ctx, count, shutdown_rx).await?;

    match outcome.reason {
        StopReason::TargetReached => info!(completed = outcome.completed, "target reached"),
        StopReason::UtxosExhausted => warn!(
            completed = outcome.completed,
            "wallet exhausted before target"
        ),
        StopReason::Cancelled => warn!(completed = outcome.completed, "run cancelled"),
    }

    Ok(())
}

/// Command-line overrides win; anything not overridden must come from
/// the config's `[mint]` section.
fn resolve_mint_params(args: &Args, config: &Config) -> anyhow::Result<(String, u64)> {
    match (&args.rune, args.count) {
        (Some(rune), Some(count)) => Ok((rune.clone(), count)),
        (rune, count) => {
            let mint = config.mint().context("resolving mint parameters")?;
            Ok((
                rune.clone().unwrap_or_else(|| mint.rune_id.clone()),
                count.unwrap_or(mint.count),
            ))
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
