//! Run-level error taxonomy for the mint loop.
//!
//! Oracle and UTXO-source failures are fatal to a run; per-transaction
//! build/broadcast failures are handled inside the loop (logged, inner
//! loop abandoned) and never reach this type.

use runemint_rpc::ClientError;
use thiserror::Error;

use crate::{build::EncodeError, fee::FeeError, watch::WatchError};

#[derive(Debug, Error)]
pub enum MintError {
    /// The fee oracle could not produce a rate.
    #[error("fee oracle: {0}")]
    FeeOracle(#[source] FeeError),

    /// Listing or reconstructing spendable outputs failed.
    #[error("utxo source: {0}")]
    UtxoSource(#[source] ClientError),

    /// Wallet or descriptor registration failed.
    #[error("wallet setup: {0}")]
    Watch(#[from] WatchError),

    /// The rune payload could not be encoded.
    #[error("payload encoding: {0}")]
    Encode(#[from] EncodeError),
}
