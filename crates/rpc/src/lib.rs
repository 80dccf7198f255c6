//! Typed JSON-RPC client for a Bitcoin full node.
//!
//! One request/response per call, `{jsonrpc, id, method, params}` in,
//! `{result, error}` out. Wallet-scoped methods are routed to
//! `<base>/wallet/<name>` when a wallet is configured.

pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use client::BitcoindClient;
pub use error::{ClientError, ClientResult};
