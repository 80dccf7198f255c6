//! The mint loop: selects outputs, decides on escalation, delegates
//! build/sign to the collaborator and accounts for progress.

use std::{sync::Arc, time::Duration};

use bitcoin::{consensus::encode::serialize_hex, Address, Amount};
use runemint_rpc::traits::{Broadcaster, Reader, Wallet};
use tokio::sync::watch;
use tracing::*;

use crate::{
    build::{BuildRequest, RuneEncoder, TxBuilder},
    errors::MintError,
    escalate::{EscalationPlan, EscalationPolicy},
    fee::FeeSource,
    progress::MintProgress,
    utxo::{list_spendable, replacement_inputs},
};

/// Everything the mint loop needs, injected at construction. One
/// logical task drives the loop; all RPC and HTTP calls block it until
/// response or transport timeout.
#[derive(Debug)]
pub struct MintContext<R, F, B, E> {
    /// Node client.
    pub rpc: Arc<R>,

    /// Market fee source.
    pub fees: Arc<F>,

    /// External transaction builder/signer.
    pub builder: Arc<B>,

    /// External rune payload encoder.
    pub encoder: Arc<E>,

    /// Escalation policy.
    pub policy: EscalationPolicy,

    /// Funding address whose outputs are spent and received back.
    pub funding_address: Address,

    /// Value placed on each mint output.
    pub postage: Amount,

    /// Fixed base fee rate; bypasses the oracle entirely when set.
    pub fee_override: Option<u64>,

    /// Fixed escalation fee rate; bypasses the oracle when set.
    pub speed_fee_override: Option<u64>,

    /// Pause before reconstructing a chain tip, letting the node's
    /// mempool view settle.
    pub settle_delay: Duration,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of mints completed.
    TargetReached,
    /// Nothing left to spend; the run ends successfully but short.
    UtxosExhausted,
    /// A shutdown signal was observed.
    Cancelled,
}

/// Final accounting for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintOutcome {
    pub completed: u64,
    pub reason: StopReason,
}

/// Runs mint iterations until `target` mints complete, the wallet runs
/// dry, or shutdown is signalled.
///
/// Oracle and UTXO-source failures abort the run. Build and broadcast
/// failures abandon the current UTXO batch and continue with a fresh
/// listing.
pub async fn run_mint_loop<R, F, B, E>(
    ctx: &MintContext<R, F, B, E>,
    target: u64,
    shutdown: watch::Receiver<bool>,
) -> Result<MintOutcome, MintError>
where
    R: Reader + Wallet + Broadcaster + Send + Sync,
    F: FeeSource + Send + Sync,
    B: TxBuilder,
    E: RuneEncoder,
{
    // The payload is identical for every mint in a run.
    let payload = ctx.encoder.mint_payload()?;
    let address = ctx.funding_address.to_string();
    let mut progress = MintProgress::new(target);

    info!(%target, %address, "starting mint run");

    while !progress.is_complete() {
        if *shutdown.borrow() {
            info!(completed = progress.completed(), "shutdown requested");
            return Ok(outcome(&progress, StopReason::Cancelled));
        }

        let base_rate = resolve_rate(ctx.fee_override, ctx.fees.as_ref()).await?;

        let utxos = list_spendable(ctx.rpc.as_ref(), &address)
            .await
            .map_err(MintError::UtxoSource)?;
        if utxos.is_empty() {
            info!(
                completed = progress.completed(),
                "no spendable outputs remain"
            );
            return Ok(outcome(&progress, StopReason::UtxosExhausted));
        }

        'batch: for utxo in &utxos {
            if *shutdown.borrow() {
                return Ok(outcome(&progress, StopReason::Cancelled));
            }

            let (inputs, fee_rate, escalation) = if ctx.policy.needs_escalation(utxo) {
                tokio::time::sleep(ctx.settle_delay).await;
                debug!(outpoint = %utxo.outpoint, "chain tip saturated, planning speed-up");

                let inputs = replacement_inputs(ctx.rpc.as_ref(), &utxo.outpoint.txid)
                    .await
                    .map_err(MintError::UtxoSource)?;
                let target_rate = resolve_rate(ctx.speed_fee_override, ctx.fees.as_ref()).await?;

                match ctx.policy.plan(utxo, target_rate as i64) {
                    EscalationPlan::AlreadySufficient { per_fee } => {
                        debug!(%per_fee, %target_rate, "package already at target rate");
                        break 'batch;
                    }
                    EscalationPlan::Bump { fee_rate, per_fee } => {
                        info!(%per_fee, %target_rate, %fee_rate, "escalating saturated chain");
                        (inputs, fee_rate.max(0) as u64, true)
                    }
                }
            } else {
                (vec![utxo.clone()], base_rate, false)
            };

            let req = BuildRequest {
                inputs,
                destination: ctx.funding_address.clone(),
                output_value: ctx.postage,
                fee_rate,
                payload: payload.clone(),
                escalation,
            };
            let tx = match ctx.builder.build(&req) {
                Ok(tx) => tx,
                Err(err) => {
                    warn!(%err, "failed to build mint transaction");
                    break 'batch;
                }
            };

            if escalation {
                progress.flag_speedup();
            }

            match ctx.rpc.send_raw_transaction(&serialize_hex(&tx)).await {
                Ok(txid) => {
                    let counted = progress.record_broadcast();
                    info!(
                        %txid,
                        %fee_rate,
                        counted,
                        completed = progress.completed(),
                        "broadcast accepted"
                    );
                    if progress.is_complete() {
                        break 'batch;
                    }
                }
                Err(err) => {
                    warn!(%err, "broadcast failed, refreshing output view");
                    progress.clear_speedup();
                    break 'batch;
                }
            }
        }
    }

    info!(completed = progress.completed(), "mint run complete");
    Ok(outcome(&progress, StopReason::TargetReached))
}

fn outcome(progress: &MintProgress, reason: StopReason) -> MintOutcome {
    MintOutcome {
        completed: progress.completed(),
        reason,
    }
}

/// A configured fixed rate bypasses the oracle entirely.
async fn resolve_rate<F: FeeSource + ?Sized>(
    fixed: Option<u64>,
    fees: &F,
) -> Result<u64, MintError> {
    match fixed {
        Some(rate) => Ok(rate),
        None => fees.fee_rate().await.map_err(MintError::FeeOracle),
    }
}
