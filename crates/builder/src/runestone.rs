//! Mint payload encoding via the `ordinals` runestone codec.

use bitcoin::ScriptBuf;
use ordinals::{RuneId, Runestone};
use runemint_minter::build::{EncodeError, RuneEncoder};

/// Encodes a mint runestone for one fixed rune.
///
/// The `ordinals` crate is pinned to an older `bitcoin` release, so the
/// enciphered script is rebuilt from raw bytes rather than converted
/// through the type system.
#[derive(Debug, Clone, Copy)]
pub struct OrdinalsEncoder {
    rune_id: RuneId,
}

impl OrdinalsEncoder {
    /// Parses a `block:tx` rune id spec.
    pub fn new(spec: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            rune_id: parse_rune_id(spec)?,
        })
    }
}

impl RuneEncoder for OrdinalsEncoder {
    fn mint_payload(&self) -> Result<ScriptBuf, EncodeError> {
        let runestone = Runestone {
            mint: Some(self.rune_id),
            edicts: Vec::new(),
            etching: None,
            pointer: None,
        };
        Ok(ScriptBuf::from_bytes(runestone.encipher().into_bytes()))
    }
}

fn parse_rune_id(spec: &str) -> Result<RuneId, EncodeError> {
    let invalid = || EncodeError::InvalidRuneId(spec.to_owned());
    let (block, tx) = spec.split_once(':').ok_or_else(invalid)?;
    let block = block.parse::<u64>().map_err(|_| invalid())?;
    let tx = tx.parse::<u32>().map_err(|_| invalid())?;
    RuneId::new(block, tx).ok_or_else(invalid)
}
