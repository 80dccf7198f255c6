//! Market fee oracle with a time-windowed cache.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::*;

/// How long a fetched quote stays fresh.
pub const FEE_REFRESH_WINDOW: Duration = Duration::from_secs(90);

#[derive(Debug, Error)]
pub enum FeeError {
    /// HTTP/connection-level failure reaching the fee endpoint.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("fee endpoint returned HTTP {0}")]
    Status(u16),

    /// The endpoint body could not be decoded.
    #[error("malformed fee response: {0}")]
    Decode(String),
}

/// Source of a target fee rate, in sat/vB.
#[async_trait]
pub trait FeeSource {
    async fn fee_rate(&self) -> Result<u64, FeeError>;
}

/// One refresh against the market endpoint. Split from the cache so
/// tests can count outbound requests.
#[async_trait]
pub trait FeeEndpoint {
    async fn fetch(&self) -> Result<u64, FeeError>;
}

/// Fixed-rate source for an explicit configuration override. This is a
/// pure bypass, not a cache entry.
#[derive(Debug, Clone, Copy)]
pub struct FixedFeeSource(pub u64);

#[async_trait]
impl FeeSource for FixedFeeSource {
    async fn fee_rate(&self) -> Result<u64, FeeError> {
        Ok(self.0)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    rate: u64,
    fetched_at: Option<Instant>,
}

/// Caches the latest market quote, refreshing at most once per window.
///
/// Concurrent callers serialize on the lock, so a refresh in progress is
/// never duplicated: the critical section spans the whole
/// read-or-refresh. A zero reading from the endpoint is treated as
/// invalid and leaves the cache untouched; callers then see the last
/// known value (zero if there has never been a good reading).
#[derive(Debug)]
pub struct CachingFeeOracle<E> {
    endpoint: E,
    window: Duration,
    state: Mutex<CacheState>,
}

impl<E> CachingFeeOracle<E> {
    pub fn new(endpoint: E) -> Self {
        Self::with_window(endpoint, FEE_REFRESH_WINDOW)
    }

    pub fn with_window(endpoint: E, window: Duration) -> Self {
        Self {
            endpoint,
            window,
            state: Mutex::new(CacheState::default()),
        }
    }
}

#[async_trait]
impl<E: FeeEndpoint + Send + Sync> FeeSource for CachingFeeOracle<E> {
    async fn fee_rate(&self) -> Result<u64, FeeError> {
        let mut state = self.state.lock().await;

        let stale = match state.fetched_at {
            None => true,
            Some(at) => at.elapsed() >= self.window,
        };

        if stale {
            let rate = self.endpoint.fetch().await?;
            if rate != 0 {
                state.rate = rate;
                state.fetched_at = Some(Instant::now());
                debug!(%rate, "refreshed market fee rate");
            } else {
                warn!("fee endpoint reported a zero rate, keeping cached value");
            }
        }

        Ok(state.rate)
    }
}

/// One sample from a mempool-explorer style fee endpoint. Only the
/// rate of the last array element is consulted.
#[derive(Debug, Deserialize)]
struct FeeSample {
    #[serde(rename = "avgFee_90")]
    avg_fee: u64,
}

/// Mempool-explorer fee endpoint: HTTP GET to a URL returning a JSON
/// array of fee-rate samples.
#[derive(Debug)]
pub struct MempoolEndpoint {
    http: reqwest::Client,
    url: String,
}

impl MempoolEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeeEndpoint for MempoolEndpoint {
    async fn fetch(&self) -> Result<u64, FeeError> {
        let resp = self.http.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeeError::Status(status.as_u16()));
        }

        let samples: Vec<FeeSample> = resp
            .json()
            .await
            .map_err(|e| FeeError::Decode(e.to_string()))?;

        // An empty series reads as a zero (invalid) sample; the cache
        // layer leaves its state alone in that case.
        Ok(samples.last().map(|s| s.avg_fee).unwrap_or(0))
    }
}
