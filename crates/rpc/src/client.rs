//! Reqwest-backed JSON-RPC 1.0 client.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::*;

use crate::{
    error::{ClientError, ClientResult},
    traits::{Broadcaster, Reader, Wallet},
    types::{
        AddressInfo, CreateWalletResult, ImportDescriptorResult, ListUnspentEntry, RawTransaction,
        RpcResponse,
    },
};

/// Full confirmation range for `listunspent`.
const MIN_CONF: u32 = 0;
const MAX_CONF: u32 = 9_999_999;

/// Where a method's request is POSTed.
#[derive(Debug, Clone, Copy)]
enum Route {
    /// The node's base endpoint.
    Base,
    /// The wallet-scoped endpoint, when a wallet is configured.
    Wallet,
}

/// JSON-RPC client for bitcoind-compatible nodes.
///
/// No request timeout is set beyond the transport default; calls block
/// until response or transport failure.
#[derive(Debug, Clone)]
pub struct BitcoindClient {
    http: reqwest::Client,
    base_url: String,
    wallet: Option<String>,
    auth: Option<(String, String)>,
}

impl BitcoindClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            wallet: None,
            auth: None,
        }
    }

    /// Sets HTTP basic-auth credentials.
    pub fn with_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((user.into(), password.into()));
        self
    }

    /// Routes wallet-scoped methods through `<base>/wallet/<name>`.
    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet = Some(wallet.into());
        self
    }

    fn url_for(&self, route: Route) -> String {
        match (route, self.wallet.as_deref()) {
            (Route::Wallet, Some(wallet)) => wallet_url(&self.base_url, wallet),
            _ => self.base_url.clone(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
        route: Route,
    ) -> ClientResult<T> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": method,
            "method": method,
            "params": params,
        });

        let mut req = self.http.post(self.url_for(route)).json(&body);
        if let Some((user, password)) = &self.auth {
            req = req.basic_auth(user, Some(password));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        trace!(%method, %status, "rpc call completed");

        // The node reports RPC errors in the body with a non-2xx status,
        // so the body is parsed before the status is judged.
        let parsed: RpcResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(ClientError::Status(status.as_u16())),
            Err(source) => return Err(ClientError::Decode { method, source }),
        };

        unwrap_response(parsed, method)
    }
}

/// Builds the wallet-scoped endpoint URL.
fn wallet_url(base: &str, wallet: &str) -> String {
    format!("{}/wallet/{}", base.trim_end_matches('/'), wallet)
}

/// Applies the `{result, error}` contract: a non-null error wins, then
/// a missing result is its own failure.
fn unwrap_response<T>(resp: RpcResponse<T>, method: &'static str) -> ClientResult<T> {
    if let Some(err) = resp.error {
        return Err(ClientError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    resp.result.ok_or(ClientError::MissingResult(method))
}

#[async_trait::async_trait]
impl Reader for BitcoindClient {
    async fn get_raw_transaction(&self, txid: &str) -> ClientResult<RawTransaction> {
        self.call("getrawtransaction", json!([txid, 1]), Route::Base)
            .await
    }
}

#[async_trait::async_trait]
impl Wallet for BitcoindClient {
    async fn list_wallets(&self) -> ClientResult<Vec<String>> {
        self.call("listwallets", json!([]), Route::Base).await
    }

    async fn create_wallet(&self, name: &str) -> ClientResult<()> {
        // Watch-only: private keys disabled, descriptor wallet. A wallet
        // holding its own keys would reject the descriptor import later.
        let params = json!([name, true, false, Value::Null, false, true]);
        let result: CreateWalletResult = self.call("createwallet", params, Route::Base).await?;
        if let Some(warning) = result.warning {
            warn!(wallet = %result.name, %warning, "createwallet warning");
        }
        Ok(())
    }

    async fn list_unspent(&self, address: &str) -> ClientResult<Vec<ListUnspentEntry>> {
        let params = json!([MIN_CONF, MAX_CONF, [address]]);
        self.call("listunspent", params, Route::Wallet).await
    }

    async fn get_address_info(&self, address: &str) -> ClientResult<AddressInfo> {
        self.call("getaddressinfo", json!([address]), Route::Wallet)
            .await
    }

    async fn import_descriptor(
        &self,
        descriptor: &str,
    ) -> ClientResult<Vec<ImportDescriptorResult>> {
        let params = json!([[{ "desc": descriptor, "timestamp": "now" }]]);
        self.call("importdescriptors", params, Route::Wallet).await
    }
}

#[async_trait::async_trait]
impl Broadcaster for BitcoindClient {
    async fn send_raw_transaction(&self, tx_hex: &str) -> ClientResult<String> {
        self.call("sendrawtransaction", json!([tx_hex]), Route::Base)
            .await
    }
}
