//! Scripted doubles shared by the unit tests in this crate.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use bitcoin::{
    absolute::LockTime,
    key::{Keypair, Secp256k1},
    secp256k1::{SecretKey, XOnlyPublicKey},
    transaction::Version,
    Address, Network, ScriptBuf, Transaction, Txid,
};
use runemint_rpc::{
    traits::{Broadcaster, Reader, Wallet},
    types::{
        AddressInfo, ImportDescriptorResult, ListUnspentEntry, RawTransaction, RawTxIn, RawTxOut,
        ScriptPubKey,
    },
    ClientError, ClientResult,
};

use crate::{
    build::{BuildError, BuildRequest, EncodeError, RuneEncoder, TxBuilder},
    fee::{FeeError, FeeSource},
};

/// Two-character hex tags for the replacement-input fixture chain.
pub(crate) const CHILD_TXID: &str = "2c";
pub(crate) const PARENT_TXID: &str = "2a";

/// Expands a two-character hex tag into a full 64-character txid.
fn txid_hex(tag: &str) -> String {
    tag.repeat(32)
}

pub(crate) fn txid_of(tag: &str) -> Txid {
    txid_hex(tag).parse().expect("valid fixture txid")
}

/// A well-formed `listunspent` entry for `tag:vout` worth `sats`.
pub(crate) fn entry(tag: &str, vout: u32, sats: u64) -> ListUnspentEntry {
    ListUnspentEntry {
        txid: Some(txid_hex(tag)),
        vout: Some(vout),
        amount: Some(sats as f64 / 100_000_000.0),
        script_pub_key: Some("51".to_owned()),
        confirmations: 1,
        ancestorfees: 0,
        ancestorsize: 0,
        ancestorcount: 0,
    }
}

pub(crate) fn test_address() -> Address {
    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(&[7u8; 32]).expect("valid key bytes");
    let keypair = Keypair::from_secret_key(&secp, &sk);
    let (internal_key, _) = XOnlyPublicKey::from_keypair(&keypair);
    Address::p2tr(&secp, internal_key, None, Network::Regtest)
}

type RpcOutcome<T> = Result<T, (i64, String)>;

fn rpc_err<T>((code, message): (i64, String)) -> ClientResult<T> {
    Err(ClientError::Rpc { code, message })
}

/// Node double driven by pre-scripted responses. Every method records
/// its call so tests can assert how the loop talked to the node.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRpc {
    unspent_batches: Mutex<VecDeque<Vec<ListUnspentEntry>>>,
    raw_txs: Mutex<HashMap<String, RawTransaction>>,
    broadcast_script: Mutex<VecDeque<RpcOutcome<String>>>,
    import_script: Mutex<VecDeque<RpcOutcome<Vec<ImportDescriptorResult>>>>,
    wallets: Mutex<Vec<String>>,
    ismine: bool,
    list_unspent_calls: AtomicUsize,
    broadcast_calls: AtomicUsize,
    import_calls: AtomicUsize,
    create_wallet_calls: AtomicUsize,
    imported: Mutex<Vec<String>>,
}

impl ScriptedRpc {
    /// Queues one `listunspent` batch. Batches are consumed in order;
    /// once exhausted the wallet reports no outputs.
    pub(crate) fn with_unspent(self, batch: Vec<ListUnspentEntry>) -> Self {
        self.unspent_batches.lock().unwrap().push_back(batch);
        self
    }

    pub(crate) fn with_ismine(mut self, ismine: bool) -> Self {
        self.ismine = ismine;
        self
    }

    pub(crate) fn with_wallets(self, wallets: Vec<String>) -> Self {
        *self.wallets.lock().unwrap() = wallets;
        self
    }

    pub(crate) fn with_import_script(
        self,
        script: Vec<RpcOutcome<Vec<ImportDescriptorResult>>>,
    ) -> Self {
        self.import_script.lock().unwrap().extend(script);
        self
    }

    /// Queues `sendrawtransaction` outcomes; once exhausted the node
    /// accepts everything.
    pub(crate) fn with_broadcast_script(self, script: Vec<RpcOutcome<String>>) -> Self {
        self.broadcast_script.lock().unwrap().extend(script);
        self
    }

    /// Registers an unconfirmed child (127 vB) spending output 1 of a
    /// confirmed parent worth 250 000 sats.
    pub(crate) fn with_raw_tx_chain(self) -> Self {
        let child = RawTransaction {
            txid: txid_hex(CHILD_TXID),
            vsize: 127,
            vin: vec![RawTxIn {
                txid: Some(txid_hex(PARENT_TXID)),
                vout: Some(1),
            }],
            vout: Vec::new(),
        };
        let parent = RawTransaction {
            txid: txid_hex(PARENT_TXID),
            vsize: 211,
            vin: Vec::new(),
            vout: vec![
                RawTxOut {
                    value: 0.001,
                    n: 0,
                    script_pub_key: ScriptPubKey {
                        hex: "51".to_owned(),
                    },
                },
                RawTxOut {
                    value: 0.0025,
                    n: 1,
                    script_pub_key: ScriptPubKey {
                        hex: "51".to_owned(),
                    },
                },
            ],
        };
        {
            let mut raw_txs = self.raw_txs.lock().unwrap();
            raw_txs.insert(child.txid.clone(), child);
            raw_txs.insert(parent.txid.clone(), parent);
        }
        self
    }

    pub(crate) fn list_unspent_calls(&self) -> usize {
        self.list_unspent_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn broadcast_calls(&self) -> usize {
        self.broadcast_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn import_calls(&self) -> usize {
        self.import_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn create_wallet_calls(&self) -> usize {
        self.create_wallet_calls.load(Ordering::SeqCst)
    }

    /// Descriptor strings passed to `importdescriptors`, in order.
    pub(crate) fn imported_descriptors(&self) -> Vec<String> {
        self.imported.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reader for ScriptedRpc {
    async fn get_raw_transaction(&self, txid: &str) -> ClientResult<RawTransaction> {
        self.raw_txs
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .ok_or(ClientError::MissingResult("getrawtransaction"))
    }
}

#[async_trait]
impl Wallet for ScriptedRpc {
    async fn list_wallets(&self) -> ClientResult<Vec<String>> {
        Ok(self.wallets.lock().unwrap().clone())
    }

    async fn create_wallet(&self, name: &str) -> ClientResult<()> {
        self.create_wallet_calls.fetch_add(1, Ordering::SeqCst);
        self.wallets.lock().unwrap().push(name.to_owned());
        Ok(())
    }

    async fn list_unspent(&self, _address: &str) -> ClientResult<Vec<ListUnspentEntry>> {
        self.list_unspent_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .unspent_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn get_address_info(&self, _address: &str) -> ClientResult<AddressInfo> {
        Ok(AddressInfo {
            ismine: self.ismine,
        })
    }

    async fn import_descriptor(
        &self,
        descriptor: &str,
    ) -> ClientResult<Vec<ImportDescriptorResult>> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        self.imported.lock().unwrap().push(descriptor.to_owned());
        match self.import_script.lock().unwrap().pop_front() {
            Some(Ok(results)) => Ok(results),
            Some(Err(err)) => rpc_err(err),
            None => Ok(vec![ImportDescriptorResult {
                success: true,
                error: None,
            }]),
        }
    }
}

#[async_trait]
impl Broadcaster for ScriptedRpc {
    async fn send_raw_transaction(&self, _tx_hex: &str) -> ClientResult<String> {
        let call = self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        match self.broadcast_script.lock().unwrap().pop_front() {
            Some(Ok(txid)) => Ok(txid),
            Some(Err(err)) => rpc_err(err),
            None => Ok(txid_hex(&format!("{:02x}", (call % 256) as u8))),
        }
    }
}

/// Builder double that records every request and returns an empty
/// but serializable transaction.
#[derive(Debug, Default)]
pub(crate) struct StubBuilder {
    requests: Mutex<Vec<BuildRequest>>,
    fail: bool,
}

impl StubBuilder {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<BuildRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TxBuilder for StubBuilder {
    fn build(&self, req: &BuildRequest) -> Result<Transaction, BuildError> {
        self.requests.lock().unwrap().push(req.clone());
        if self.fail {
            return Err(BuildError::Signing("scripted failure".to_owned()));
        }
        Ok(Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: Vec::new(),
            output: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct StubEncoder;

impl RuneEncoder for StubEncoder {
    fn mint_payload(&self) -> Result<ScriptBuf, EncodeError> {
        Ok(ScriptBuf::from_bytes(vec![0x6a]))
    }
}

/// Fee source whose endpoint is always down.
#[derive(Debug)]
pub(crate) struct FailingFeeSource;

#[async_trait]
impl FeeSource for FailingFeeSource {
    async fn fee_rate(&self) -> Result<u64, FeeError> {
        Err(FeeError::Status(503))
    }
}
