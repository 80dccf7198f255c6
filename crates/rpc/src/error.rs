//! Client error taxonomy.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the node RPC client.
///
/// `Rpc` carries the node's error message verbatim; any non-null
/// `error` field in a response is treated as a request failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP/connection-level failure.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// The node answered with a non-success HTTP status and no
    /// parseable JSON-RPC body.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The top-level response body could not be parsed.
    #[error("malformed response for {method}: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The node reported an application-level error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Neither a result nor an error was present in the response.
    #[error("missing result for {0}")]
    MissingResult(&'static str),
}

impl ClientError {
    /// Returns the node's error message if this is an RPC-level error.
    pub fn rpc_message(&self) -> Option<&str> {
        match self {
            Self::Rpc { message, .. } => Some(message),
            _ => None,
        }
    }
}
