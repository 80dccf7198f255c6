//! Taproot key-spend mint transactions.
//!
//! One transaction per mint: the runestone payload in an OP_RETURN, a
//! postage output carrying the minted runes, and change back to the
//! funding address. Fees are found by iterating the size estimate until
//! it converges.

use bitcoin::{
    absolute::LockTime,
    hashes::Hash,
    key::TapTweak as _,
    secp256k1::{All, Keypair, Message, Secp256k1, XOnlyPublicKey},
    sighash::{Prevouts, SighashCache},
    taproot,
    transaction::Version,
    Address, Amount, Network, ScriptBuf, Sequence, TapSighashType, Transaction, TxIn, TxOut,
    Witness,
};
use runemint_minter::{
    build::{BuildError, BuildRequest, TxBuilder},
    utxo::Utxo,
};

/// Outputs at or below this are uneconomical to relay.
const DUST_LIMIT: u64 = 546;

/// A taproot key-spend signature under sighash `Default`.
const SCHNORR_SIG_LEN: usize = 64;

/// Builds and signs key-spend transactions for a single taproot key.
/// Every input must be locked to that key's own output script.
pub struct KeySpendBuilder {
    secp: Secp256k1<All>,
    tweaked: Keypair,
    script_pubkey: ScriptBuf,
}

impl std::fmt::Debug for KeySpendBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySpendBuilder")
            .field("script_pubkey", &self.script_pubkey)
            .finish_non_exhaustive()
    }
}

impl KeySpendBuilder {
    pub fn new(keypair: &Keypair, network: Network) -> Self {
        let secp = Secp256k1::new();
        let (internal_key, _) = XOnlyPublicKey::from_keypair(keypair);
        // Key-spend with no script tree uses the empty merkle root tweak.
        let tweaked = keypair.tap_tweak(&secp, None);
        let script_pubkey = Address::p2tr(&secp, internal_key, None, network).script_pubkey();
        Self {
            secp,
            tweaked: tweaked.to_inner(),
            script_pubkey,
        }
    }

    fn sign(&self, mut tx: Transaction, spent: &[Utxo]) -> Result<Transaction, BuildError> {
        let prevouts: Vec<TxOut> = spent
            .iter()
            .map(|u| TxOut {
                value: u.value,
                script_pubkey: u.script_pubkey.clone(),
            })
            .collect();
        let prevouts = Prevouts::All(&prevouts);

        let mut signatures = Vec::with_capacity(tx.input.len());
        let mut cache = SighashCache::new(&tx);
        for index in 0..tx.input.len() {
            let sighash = cache
                .taproot_key_spend_signature_hash(index, &prevouts, TapSighashType::Default)
                .map_err(|e| BuildError::Signing(e.to_string()))?;
            let msg = Message::from_digest(sighash.to_byte_array());
            signatures.push(self.secp.sign_schnorr_no_aux_rand(&msg, &self.tweaked));
        }
        drop(cache);

        for (input, signature) in tx.input.iter_mut().zip(signatures) {
            input.witness = Witness::p2tr_key_spend(&taproot::Signature {
                signature,
                sighash_type: TapSighashType::Default,
            });
        }
        Ok(tx)
    }
}

impl TxBuilder for KeySpendBuilder {
    fn build(&self, req: &BuildRequest) -> Result<Transaction, BuildError> {
        if req.inputs.is_empty() {
            return Err(BuildError::NoInputs);
        }
        for utxo in &req.inputs {
            if utxo.script_pubkey != self.script_pubkey {
                return Err(BuildError::UnsupportedInput(utxo.outpoint.to_string()));
            }
        }

        let total: u64 = req.inputs.iter().map(|u| u.value.to_sat()).sum();
        let postage = req.output_value.to_sat();

        // The minted runes land on the first non-OP_RETURN output.
        let base_outputs = vec![
            TxOut {
                value: req.output_value,
                script_pubkey: req.destination.script_pubkey(),
            },
            TxOut {
                value: Amount::ZERO,
                script_pubkey: req.payload.clone(),
            },
        ];
        let inputs: Vec<TxIn> = req
            .inputs
            .iter()
            .map(|u| TxIn {
                previous_output: u.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
            .collect();

        // Iterate until the size estimate stops moving; adding a change
        // output grows the transaction, which grows the fee.
        let mut last_vsize = estimated_vsize(&inputs, &base_outputs);
        let unsigned = loop {
            let fee = last_vsize * req.fee_rate;
            let needed = postage + fee;
            if total < needed {
                return Err(BuildError::InsufficientFunds {
                    needed,
                    available: total,
                });
            }

            let mut outputs = base_outputs.clone();
            let change = total - needed;
            // A sub-dust remainder is folded into the fee; that also
            // ends the iteration, since dropping the change output
            // would otherwise shrink the size estimate and flip the
            // remainder back above dust forever.
            let mut done = false;
            if change > DUST_LIMIT {
                outputs.push(TxOut {
                    value: Amount::from_sat(change),
                    script_pubkey: self.script_pubkey.clone(),
                });
            } else {
                done = true;
            }

            let vsize = estimated_vsize(&inputs, &outputs);
            if vsize == last_vsize || done {
                break Transaction {
                    version: Version::TWO,
                    lock_time: LockTime::ZERO,
                    input: inputs,
                    output: outputs,
                };
            }
            last_vsize = vsize;
        };

        self.sign(unsigned, &req.inputs)
    }
}

/// Virtual size with a dummy key-spend witness on every input. The
/// dummy matches the final signature length exactly, so the signed
/// transaction has the same vsize as the estimate.
fn estimated_vsize(inputs: &[TxIn], outputs: &[TxOut]) -> u64 {
    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs.to_vec(),
        output: outputs.to_vec(),
    };
    for input in &mut tx.input {
        input.witness = Witness::from_slice(&[[0u8; SCHNORR_SIG_LEN]]);
    }
    tx.vsize() as u64
}
