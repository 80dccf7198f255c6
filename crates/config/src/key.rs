//! Key handling for the funding address.

use bitcoin::{
    key::{Keypair, Secp256k1},
    secp256k1::SecretKey,
    Address, Network, XOnlyPublicKey,
};

use crate::errors::ConfigError;

/// A funding keypair together with its key-path taproot address.
///
/// The address commits to the tweaked output key with no script tree,
/// so the key alone can spend via the key path.
#[derive(Debug, Clone)]
pub struct SigningKey {
    keypair: Keypair,
    address: Address,
    network: Network,
}

impl SigningKey {
    /// Parses a hex-encoded 32-byte secret and derives the taproot
    /// address for the given network.
    pub fn from_hex(raw: &str, network: Network) -> Result<Self, ConfigError> {
        let bytes: Vec<u8> =
            hex::decode(raw).map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;

        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret);
        let (internal_key, _) = XOnlyPublicKey::from_keypair(&keypair);
        let address = Address::p2tr(&secp, internal_key, None, network);

        Ok(Self {
            keypair,
            address,
            network,
        })
    }

    /// The untweaked keypair for key-path signing.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// The funding address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Network the address was derived for.
    pub fn network(&self) -> Network {
        self.network
    }
}
