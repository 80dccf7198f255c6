//! Typed response structs per RPC method.
//!
//! Fields a flaky node may omit or mangle are optional; record-level
//! validation happens in the callers so one bad entry never fails a
//! whole call.

use serde::{Deserialize, Deserializer};

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorBody>,
}

/// The `error` object of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

/// One entry of a `listunspent` result.
///
/// The node may return `ancestorfees`/`ancestorsize` either as plain
/// numbers or as comma-formatted strings; both normalize to integers,
/// and anything unparseable normalizes to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct ListUnspentEntry {
    pub txid: Option<String>,
    pub vout: Option<u32>,
    /// Value in BTC.
    pub amount: Option<f64>,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: Option<String>,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default, deserialize_with = "ancestor_metric")]
    pub ancestorfees: i64,
    #[serde(default, deserialize_with = "ancestor_metric")]
    pub ancestorsize: i64,
    #[serde(default)]
    pub ancestorcount: u32,
}

/// `getaddressinfo` result, reduced to the ownership flag.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInfo {
    #[serde(default)]
    pub ismine: bool,
}

/// One entry of an `importdescriptors` result array.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportDescriptorResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

/// `createwallet` result.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWalletResult {
    pub name: String,
    #[serde(default)]
    pub warning: Option<String>,
}

/// `getrawtransaction` (verbose) result, reduced to what input
/// reconstruction needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub txid: String,
    pub vsize: i64,
    pub vin: Vec<RawTxIn>,
    pub vout: Vec<RawTxOut>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTxIn {
    /// Absent for coinbase inputs.
    pub txid: Option<String>,
    pub vout: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTxOut {
    /// Value in BTC.
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptPubKey {
    pub hex: String,
}

/// Accepts a number or a comma-formatted string; unparseable strings
/// normalize to zero rather than failing the record.
fn ancestor_metric<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n as i64,
        Raw::Str(s) => s.replace(',', "").parse().unwrap_or(0),
    })
}
