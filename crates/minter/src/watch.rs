//! Watch-only registration of the funding address with the node wallet.
//!
//! The node computes descriptor checksums with an algorithm the client
//! does not implement; instead of deriving the checksum locally, the
//! import is submitted with a placeholder and the computed checksum is
//! negotiated out of the node's rejection message.

use runemint_rpc::{traits::Wallet, ClientError};
use thiserror::Error;
use tracing::*;

/// Cap on checksum negotiation round-trips. The node normally corrects
/// the checksum on the first retry; anything past this means its error
/// format changed and looping further would never converge.
pub const MAX_CHECKSUM_ATTEMPTS: usize = 5;

/// Submitted on the first attempt; guaranteed wrong, which makes the
/// node reveal the computed checksum.
const PLACEHOLDER_CHECKSUM: &str = "00000000";

/// Fixed phrase the node uses in its checksum-mismatch message.
const CHECKSUM_NEEDLE: &str = "does not match computed checksum '";

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("rpc: {0}")]
    Rpc(#[from] ClientError),

    /// The node rejected the import for a reason other than a checksum
    /// mismatch.
    #[error("descriptor import rejected: {0}")]
    Rejected(String),

    #[error("checksum negotiation did not converge after {MAX_CHECKSUM_ATTEMPTS} attempts")]
    NegotiationExhausted,
}

/// Ensures the wallet named `name` exists on the node, creating a
/// watch-only descriptor wallet if it does not.
pub async fn ensure_wallet<R: Wallet>(rpc: &R, name: &str) -> Result<(), WatchError> {
    let wallets = rpc.list_wallets().await?;
    if wallets.iter().any(|w| w == name) {
        debug!(wallet = %name, "wallet already loaded");
        return Ok(());
    }
    rpc.create_wallet(name).await?;
    info!(wallet = %name, "created watch-only wallet");
    Ok(())
}

/// Ensures `address` is tracked by the node wallet, negotiating the
/// descriptor checksum through the node's error channel.
///
/// States: Unregistered -> Imported | Failed. Each attempt is
/// stateless; only the candidate checksum carries across retries.
pub async fn ensure_watched<R: Wallet>(rpc: &R, address: &str) -> Result<(), WatchError> {
    if rpc.get_address_info(address).await?.ismine {
        debug!(%address, "address already tracked by wallet");
        return Ok(());
    }

    let mut checksum = PLACEHOLDER_CHECKSUM.to_owned();
    for attempt in 1..=MAX_CHECKSUM_ATTEMPTS {
        let descriptor = format!("addr({address})#{checksum}");
        trace!(%attempt, %descriptor, "submitting descriptor import");

        let rejection = match rpc.import_descriptor(&descriptor).await {
            Ok(results) => {
                if results.iter().all(|r| r.success) {
                    info!(%address, "descriptor imported");
                    return Ok(());
                }
                results
                    .iter()
                    .find_map(|r| r.error.as_ref())
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "import unsuccessful with no error detail".to_owned())
            }
            // A checksum mismatch may also surface as a top-level RPC
            // error depending on node version.
            Err(err) => match err.rpc_message() {
                Some(message) => message.to_owned(),
                None => return Err(err.into()),
            },
        };

        match extract_computed_checksum(&rejection) {
            Some(computed) => {
                debug!(provided = %checksum, %computed, "retrying with node-computed checksum");
                checksum = computed;
            }
            None => return Err(WatchError::Rejected(rejection)),
        }
    }

    Err(WatchError::NegotiationExhausted)
}

/// Pulls the computed checksum out of a message of the form
/// `Provided checksum 'xxxx' does not match computed checksum 'yyyy'`.
fn extract_computed_checksum(message: &str) -> Option<String> {
    let start = message.find(CHECKSUM_NEEDLE)? + CHECKSUM_NEEDLE.len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    let checksum = &rest[..end];
    (!checksum.is_empty()).then(|| checksum.to_owned())
}

#[cfg(test)]
mod tests {
    use runemint_rpc::types::{ImportDescriptorResult, RpcErrorBody};

    use super::*;
    use crate::testutil::ScriptedRpc;

    const MISMATCH: &str =
        "Provided checksum 'aaaaaaaa' does not match computed checksum 'zzzzzzzz'";

    #[test]
    fn extracts_the_computed_checksum() {
        assert_eq!(
            extract_computed_checksum(MISMATCH).as_deref(),
            Some("zzzzzzzz")
        );
    }

    #[test]
    fn unrelated_messages_yield_nothing() {
        assert!(extract_computed_checksum("Descriptor is not valid").is_none());
        assert!(extract_computed_checksum("does not match computed checksum ''").is_none());
    }

    #[tokio::test]
    async fn owned_address_short_circuits() {
        let rpc = ScriptedRpc::default().with_ismine(true);
        ensure_watched(&rpc, "bc1p-test").await.unwrap();
        assert_eq!(rpc.import_calls(), 0, "no import should be attempted");
    }

    #[tokio::test]
    async fn negotiates_checksum_from_item_error() {
        let rpc = ScriptedRpc::default().with_import_script(vec![
            Ok(vec![ImportDescriptorResult {
                success: false,
                error: Some(RpcErrorBody {
                    code: -5,
                    message: MISMATCH.to_owned(),
                }),
            }]),
            Ok(vec![ImportDescriptorResult {
                success: true,
                error: None,
            }]),
        ]);

        ensure_watched(&rpc, "bc1p-test").await.unwrap();

        let descriptors = rpc.imported_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[0].ends_with("#00000000"));
        assert!(descriptors[1].ends_with("#zzzzzzzz"));
    }

    #[tokio::test]
    async fn negotiates_checksum_from_rpc_error() {
        let rpc = ScriptedRpc::default().with_import_script(vec![
            Err((-5, MISMATCH.to_owned())),
            Ok(vec![ImportDescriptorResult {
                success: true,
                error: None,
            }]),
        ]);

        ensure_watched(&rpc, "bc1p-test").await.unwrap();
        assert!(rpc.imported_descriptors()[1].ends_with("#zzzzzzzz"));
    }

    #[tokio::test]
    async fn other_rejections_are_fatal() {
        let rpc = ScriptedRpc::default()
            .with_import_script(vec![Err((-8, "Descriptor is not valid".to_owned()))]);

        let err = ensure_watched(&rpc, "bc1p-test").await.unwrap_err();
        assert!(matches!(err, WatchError::Rejected(_)));
        assert_eq!(rpc.import_calls(), 1);
    }

    #[tokio::test]
    async fn negotiation_is_bounded() {
        // The node keeps rejecting with a "new" checksum forever.
        let script = (0..MAX_CHECKSUM_ATTEMPTS + 3)
            .map(|_| Err((-5, MISMATCH.to_owned())))
            .collect();
        let rpc = ScriptedRpc::default().with_import_script(script);

        let err = ensure_watched(&rpc, "bc1p-test").await.unwrap_err();
        assert!(matches!(err, WatchError::NegotiationExhausted));
        assert_eq!(rpc.import_calls(), MAX_CHECKSUM_ATTEMPTS);
    }

    #[tokio::test]
    async fn ensure_wallet_skips_existing() {
        let rpc = ScriptedRpc::default().with_wallets(vec!["mint".to_owned()]);
        ensure_wallet(&rpc, "mint").await.unwrap();
        assert_eq!(rpc.create_wallet_calls(), 0);
    }

    #[tokio::test]
    async fn ensure_wallet_creates_missing() {
        let rpc = ScriptedRpc::default();
        ensure_wallet(&rpc, "mint").await.unwrap();
        assert_eq!(rpc.create_wallet_calls(), 1);
    }
}
