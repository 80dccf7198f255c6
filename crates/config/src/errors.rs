//! Errors raised while loading or validating configuration.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the config file from disk.
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    /// The config file is not valid TOML or has the wrong shape.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// No private key was provided.
    #[error("private_key is required")]
    MissingPrivateKey,

    /// The private key is not a valid 32-byte hex secret.
    #[error("private_key is invalid: {0}")]
    InvalidPrivateKey(String),

    /// The `[mint]` section is required to run a mint.
    #[error("mint config is required")]
    MissingMint,

    /// The mint section is present but incomplete.
    #[error("mint config is invalid: {0}")]
    InvalidMint(String),
}
