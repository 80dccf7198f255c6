//! Seams for the external transaction-building and rune-encoding
//! collaborators.

use bitcoin::{Address, Amount, ScriptBuf, Transaction};
use thiserror::Error;

use crate::utxo::Utxo;

/// Everything the builder needs to produce one signed transaction.
///
/// Builders must be deterministic given an identical request, must
/// embed `payload` in an unspendable data output, and must take their
/// fee as `fee_rate` times the estimated virtual size.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Inputs to spend: a single fresh UTXO for a new mint, or the
    /// replaced transaction's full input set for an escalation.
    pub inputs: Vec<Utxo>,
    pub destination: Address,
    /// Value placed on the destination output.
    pub output_value: Amount,
    /// Fee rate in sat/vB.
    pub fee_rate: u64,
    /// Opaque rune payload script.
    pub payload: ScriptBuf,
    /// Whether this replaces an unconfirmed chain tip.
    pub escalation: bool,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no inputs to spend")]
    NoInputs,

    #[error("insufficient funds: need {needed} sats, have {available} sats")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
}

/// Builds and signs one transaction from a request.
pub trait TxBuilder {
    fn build(&self, req: &BuildRequest) -> Result<Transaction, BuildError>;
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid rune id: {0}")]
    InvalidRuneId(String),
}

/// Produces the opaque rune payload attached to each mint transaction.
/// Encoded once per run.
pub trait RuneEncoder {
    fn mint_payload(&self) -> Result<ScriptBuf, EncodeError>;
}
