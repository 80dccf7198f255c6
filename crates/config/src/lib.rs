//! Configuration for the rune mint engine.

mod config;
mod errors;
mod key;

pub use config::{Config, MintConfig};
pub use errors::ConfigError;
pub use key::SigningKey;
