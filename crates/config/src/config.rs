use std::{fs, path::Path};

use bitcoin::Network;
use serde::Deserialize;

use crate::{errors::ConfigError, key::SigningKey};

/// Default wallet name used for watch-only descriptor registration.
const DEFAULT_WALLET_NAME: &str = "runemint-watch";

/// Default value placed on the mint output, in satoshis.
const DEFAULT_POSTAGE_SATS: u64 = 330;

/// Default mempool package-chain ceiling enforced by node relay policy.
const DEFAULT_PACKAGE_LIMIT: u32 = 25;

/// Default pause before gathering replacement inputs, in seconds.
const DEFAULT_SETTLE_DELAY_SECS: u64 = 3;

/// Top-level configuration, loaded from a TOML file.
///
/// A `fee_per_vbyte` of zero means "ask the fee oracle"; any nonzero value
/// is a pure override and the oracle is never consulted. The same applies
/// to `speed_fee_per_vbyte` for escalation fees.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Wallet the watch-only descriptor is registered into.
    #[serde(default = "default_wallet_name")]
    pub wallet_name: String,

    /// Hex-encoded 32-byte private key for the funding address.
    #[serde(default)]
    pub private_key: String,

    /// Network the addresses and transactions are built for.
    #[serde(default = "default_network")]
    pub network: Network,

    /// Bitcoin node JSON-RPC endpoint.
    pub rpc_url: String,

    /// Optional RPC basic-auth username.
    #[serde(default)]
    pub rpc_user: Option<String>,

    /// Optional RPC basic-auth password.
    #[serde(default)]
    pub rpc_password: Option<String>,

    /// Fee market endpoint returning an array of fee-rate samples.
    pub fee_endpoint: String,

    /// Fixed fee rate in sat/vB. Zero consults the oracle.
    #[serde(default)]
    pub fee_per_vbyte: u64,

    /// Fixed escalation fee rate in sat/vB. Zero consults the oracle.
    #[serde(default)]
    pub speed_fee_per_vbyte: u64,

    /// Value placed on each mint output, in satoshis.
    #[serde(default = "default_postage_sats")]
    pub postage_sats: u64,

    /// Whether stuck ancestor chains get fee-bumped automatically.
    #[serde(default)]
    pub auto_speedup: bool,

    /// Node mempool package-chain ceiling. Node policy can vary, so this
    /// is configurable rather than assumed.
    #[serde(default = "default_package_limit")]
    pub package_limit: u32,

    /// Pause before gathering replacement inputs, letting the node's
    /// mempool view settle.
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    /// Mint operation parameters.
    #[serde(default)]
    pub mint: Option<MintConfig>,
}

/// Parameters for a mint run.
#[derive(Debug, Clone, Deserialize)]
pub struct MintConfig {
    /// Rune id in `block:tx` form.
    pub rune_id: String,

    /// How many mints to complete before the run exits.
    pub count: u64,
}

fn default_wallet_name() -> String {
    DEFAULT_WALLET_NAME.to_owned()
}

fn default_network() -> Network {
    Network::Bitcoin
}

fn default_postage_sats() -> u64 {
    DEFAULT_POSTAGE_SATS
}

fn default_package_limit() -> u32 {
    DEFAULT_PACKAGE_LIMIT
}

fn default_settle_delay_secs() -> u64 {
    DEFAULT_SETTLE_DELAY_SECS
}

impl Config {
    /// Reads and parses the config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_owned(), e))?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Returns the validated mint parameters, failing if the section is
    /// missing or incomplete.
    pub fn mint(&self) -> Result<&MintConfig, ConfigError> {
        let mint = self.mint.as_ref().ok_or(ConfigError::MissingMint)?;
        if mint.rune_id.is_empty() {
            return Err(ConfigError::InvalidMint("rune_id is required".to_owned()));
        }
        if mint.count == 0 {
            return Err(ConfigError::InvalidMint("count must be nonzero".to_owned()));
        }
        Ok(mint)
    }

    /// Derives the signing key and funding address from the configured
    /// private key.
    pub fn signing_key(&self) -> Result<SigningKey, ConfigError> {
        if self.private_key.is_empty() {
            return Err(ConfigError::MissingPrivateKey);
        }
        SigningKey::from_hex(&self.private_key, self.network)
    }
}
