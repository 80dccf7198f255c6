//! Spendable-output queries against the node wallet.

use bitcoin::{Amount, OutPoint, ScriptBuf, Txid};
use runemint_rpc::{
    traits::{Reader, Wallet},
    types::ListUnspentEntry,
    ClientResult,
};
use thiserror::Error;
use tracing::*;

/// Outputs at or below this value are excluded from selection; they are
/// too small to carry a mint plus its fee.
pub const MIN_SPENDABLE_SATS: u64 = 100_000;

/// Immutable snapshot of one unspent output, including the node's view
/// of its unconfirmed ancestor package. Fetched fresh each loop
/// iteration and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
    /// Total fees of the unconfirmed ancestor package, in sats.
    pub ancestor_fees: i64,
    /// Total virtual size of the unconfirmed ancestor package, in vB.
    pub ancestor_vsize: i64,
    /// Count of unconfirmed ancestors in the package.
    pub ancestor_count: u32,
    pub confirmations: u32,
}

/// Why one `listunspent` entry was rejected. Rejections are logged and
/// skipped, never fatal to the listing.
#[derive(Debug, Error)]
enum EntryError {
    #[error("missing field {0}")]
    Missing(&'static str),
    #[error("bad txid: {0}")]
    BadTxid(String),
    #[error("bad script hex: {0}")]
    BadScript(String),
    #[error("bad amount: {0}")]
    BadAmount(String),
}

fn utxo_from_entry(entry: &ListUnspentEntry) -> Result<Utxo, EntryError> {
    let txid = entry
        .txid
        .as_deref()
        .ok_or(EntryError::Missing("txid"))?
        .parse::<Txid>()
        .map_err(|e| EntryError::BadTxid(e.to_string()))?;
    let vout = entry.vout.ok_or(EntryError::Missing("vout"))?;
    let amount = entry.amount.ok_or(EntryError::Missing("amount"))?;
    let script_hex = entry
        .script_pub_key
        .as_deref()
        .ok_or(EntryError::Missing("scriptPubKey"))?;

    let value = Amount::from_btc(amount).map_err(|e| EntryError::BadAmount(e.to_string()))?;
    let script_pubkey =
        ScriptBuf::from_hex(script_hex).map_err(|e| EntryError::BadScript(e.to_string()))?;

    Ok(Utxo {
        outpoint: OutPoint { txid, vout },
        value,
        script_pubkey,
        ancestor_fees: entry.ancestorfees,
        ancestor_vsize: entry.ancestorsize,
        ancestor_count: entry.ancestorcount,
        confirmations: entry.confirmations,
    })
}

/// Lists spendable outputs of `address`, dropping dust and malformed
/// entries.
pub async fn list_spendable<R: Wallet>(rpc: &R, address: &str) -> ClientResult<Vec<Utxo>> {
    let entries = rpc.list_unspent(address).await?;

    let mut utxos = Vec::with_capacity(entries.len());
    for entry in &entries {
        let utxo = match utxo_from_entry(entry) {
            Ok(utxo) => utxo,
            Err(err) => {
                warn!(%err, "skipping malformed listunspent entry");
                continue;
            }
        };
        if utxo.value.to_sat() <= MIN_SPENDABLE_SATS {
            trace!(outpoint = %utxo.outpoint, value = %utxo.value, "skipping dust output");
            continue;
        }
        utxos.push(utxo);
    }

    Ok(utxos)
}

/// Reconstructs the input set of an unconfirmed transaction so a
/// replacement can respend the same ancestor chain tip.
///
/// Each returned snapshot carries the replaced transaction's vsize as
/// the package size; the replacement spends exactly what the original
/// spent, so ancestor fee metrics are reset.
pub async fn replacement_inputs<R: Reader>(rpc: &R, txid: &Txid) -> ClientResult<Vec<Utxo>> {
    let original = rpc.get_raw_transaction(&txid.to_string()).await?;

    let mut inputs = Vec::with_capacity(original.vin.len());
    for vin in &original.vin {
        let (Some(prev_txid), Some(prev_vout)) = (vin.txid.as_deref(), vin.vout) else {
            // Coinbase inputs cannot appear in an unconfirmed chain.
            continue;
        };

        let prev_tx = rpc.get_raw_transaction(prev_txid).await?;
        let Some(out) = prev_tx.vout.iter().find(|o| o.n == prev_vout) else {
            warn!(%prev_txid, %prev_vout, "prevout not found in parent transaction");
            continue;
        };

        let entry = ListUnspentEntry {
            txid: Some(prev_txid.to_owned()),
            vout: Some(prev_vout),
            amount: Some(out.value),
            script_pub_key: Some(out.script_pub_key.hex.clone()),
            confirmations: 0,
            ancestorfees: 0,
            ancestorsize: original.vsize,
            ancestorcount: 0,
        };
        match utxo_from_entry(&entry) {
            Ok(utxo) => inputs.push(utxo),
            Err(err) => warn!(%err, %prev_txid, "skipping unusable replacement input"),
        }
    }

    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{entry, ScriptedRpc};

    #[tokio::test]
    async fn dust_boundary_is_strict() {
        // 5 fixtures spanning the boundary.
        let rpc = ScriptedRpc::default().with_unspent(vec![
            entry("11", 0, 50_000),
            entry("22", 0, 100_000),
            entry("33", 0, 100_001),
            entry("44", 1, 150_000),
            entry("55", 0, 1_000_000),
        ]);

        let utxos = list_spendable(&rpc, "addr").await.unwrap();
        let values: Vec<u64> = utxos.iter().map(|u| u.value.to_sat()).collect();
        assert_eq!(
            values,
            vec![100_001, 150_000, 1_000_000],
            "outputs at or below {MIN_SPENDABLE_SATS} sats are excluded"
        );
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped_not_fatal() {
        let mut bad = entry("66", 0, 500_000);
        bad.txid = None;
        let mut bad_script = entry("77", 0, 500_000);
        bad_script.script_pub_key = Some("zz-not-hex".to_owned());

        let rpc =
            ScriptedRpc::default().with_unspent(vec![bad, bad_script, entry("88", 0, 500_000)]);

        let utxos = list_spendable(&rpc, "addr").await.unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].value.to_sat(), 500_000);
    }

    #[tokio::test]
    async fn ancestor_metrics_carry_through() {
        let mut e = entry("99", 2, 400_000);
        e.ancestorfees = 133_350;
        e.ancestorsize = 3_175;
        e.ancestorcount = 25;

        let rpc = ScriptedRpc::default().with_unspent(vec![e]);
        let utxos = list_spendable(&rpc, "addr").await.unwrap();
        assert_eq!(utxos[0].ancestor_fees, 133_350);
        assert_eq!(utxos[0].ancestor_vsize, 3_175);
        assert_eq!(utxos[0].ancestor_count, 25);
        assert_eq!(utxos[0].outpoint.vout, 2);
    }

    #[tokio::test]
    async fn replacement_inputs_respend_the_original_inputs() {
        let rpc = ScriptedRpc::default().with_raw_tx_chain();

        let txid = crate::testutil::txid_of(crate::testutil::CHILD_TXID);
        let inputs = replacement_inputs(&rpc, &txid).await.unwrap();

        assert_eq!(inputs.len(), 1);
        assert_eq!(
            inputs[0].outpoint.txid,
            crate::testutil::txid_of(crate::testutil::PARENT_TXID)
        );
        assert_eq!(inputs[0].outpoint.vout, 1);
        assert_eq!(inputs[0].value.to_sat(), 250_000);
        // The replaced tx's vsize becomes the package size; fee metrics reset.
        assert_eq!(inputs[0].ancestor_vsize, 127);
        assert_eq!(inputs[0].ancestor_fees, 0);
        assert_eq!(inputs[0].ancestor_count, 0);
    }
}
