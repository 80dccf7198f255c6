//! Trait seams for the node RPC surface.
//!
//! The mint engine is generic over these so tests can substitute
//! scripted doubles for a live node.

use async_trait::async_trait;

use crate::{
    error::ClientResult,
    types::{AddressInfo, ImportDescriptorResult, ListUnspentEntry, RawTransaction},
};

/// Read-only chain queries.
#[async_trait]
pub trait Reader {
    /// `getrawtransaction` in verbose mode.
    async fn get_raw_transaction(&self, txid: &str) -> ClientResult<RawTransaction>;
}

/// Wallet-scoped queries and mutations.
#[async_trait]
pub trait Wallet {
    /// `listwallets`.
    async fn list_wallets(&self) -> ClientResult<Vec<String>>;

    /// `createwallet` for a watch-only wallet (private keys disabled).
    async fn create_wallet(&self, name: &str) -> ClientResult<()>;

    /// `listunspent` over the full confirmation range, scoped to one
    /// address.
    async fn list_unspent(&self, address: &str) -> ClientResult<Vec<ListUnspentEntry>>;

    /// `getaddressinfo`.
    async fn get_address_info(&self, address: &str) -> ClientResult<AddressInfo>;

    /// `importdescriptors` with a single descriptor request.
    async fn import_descriptor(&self, descriptor: &str)
        -> ClientResult<Vec<ImportDescriptorResult>>;
}

/// Transaction submission.
#[async_trait]
pub trait Broadcaster {
    /// `sendrawtransaction`; returns the accepted txid.
    async fn send_raw_transaction(&self, tx_hex: &str) -> ClientResult<String>;
}
