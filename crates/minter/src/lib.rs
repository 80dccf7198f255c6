//! Mint orchestration engine: fee oracle, UTXO selection, descriptor
//! registration, unconfirmed-chain fee escalation and the mint loop
//! that drives them.

pub mod build;
pub mod errors;
pub mod escalate;
pub mod fee;
pub mod progress;
pub mod task;
pub mod utxo;
pub mod watch;

#[cfg(test)]
mod testutil;

pub use errors::MintError;
pub use task::{run_mint_loop, MintContext, MintOutcome, StopReason};
