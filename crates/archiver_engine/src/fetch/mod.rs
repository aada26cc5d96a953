//! Media download with retry, backoff and a strategy chain.
//!
//! Each attempt walks the strategy chain in order. A failure that looks like
//! a network-layer block hands the request to the next strategy within the
//! same attempt; any other failure ends the attempt. Retryable failures are
//! retried after `base_delay * 2^(attempt - 1)`.
mod direct;
mod format;
mod relay;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_warn};
use futures_util::future::join_all;
use url::Url;

use crate::{ArchiveEvent, FailureKind, FetchError, ProgressSink};

pub use direct::{DirectSettings, DirectStrategy};
pub use format::MediaFormat;
pub use relay::{PrivilegedRelay, RelayError, RelayRequest, RelayResponse, RelayStrategy};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub max_attempts: u32,
    /// Upper bound for one attempt, strategy fallbacks included.
    pub timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Pause after the failed `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub final_url: String,
    pub format: Option<MediaFormat>,
}

/// One way of turning a URL into bytes.
#[async_trait::async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchedMedia, FetchError>;
}

/// Outcome of [`MediaFetcher::fetch_batch`]. Failed items are reported, not
/// raised; a batch as a whole never fails.
#[derive(Debug, Default)]
pub struct BatchFetchReport {
    pub results: HashMap<String, Result<FetchedMedia, FetchError>>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchFetchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn get(&self, url: &str) -> Option<&Result<FetchedMedia, FetchError>> {
        self.results.get(url)
    }
}

pub struct MediaFetcher {
    strategies: Vec<Arc<dyn FetchStrategy>>,
    retry: RetryPolicy,
}

impl Default for MediaFetcher {
    fn default() -> Self {
        Self::direct(DirectSettings::default())
    }
}

impl MediaFetcher {
    pub fn new(strategies: Vec<Arc<dyn FetchStrategy>>) -> Self {
        Self {
            strategies,
            retry: RetryPolicy::default(),
        }
    }

    pub fn direct(settings: DirectSettings) -> Self {
        let direct: Arc<dyn FetchStrategy> = Arc::new(DirectStrategy::new(settings));
        Self::new(vec![direct])
    }

    /// Append a relay strategy behind the existing chain.
    pub fn with_relay<R: PrivilegedRelay + 'static>(mut self, relay: R) -> Self {
        self.strategies.push(Arc::new(RelayStrategy::new(relay)));
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn fetch_one(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchedMedia, FetchError> {
        let parsed = parse_media_url(url)?;
        let max_attempts = options.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match self.attempt(&parsed, options).await {
                Ok(media) => return Ok(media),
                Err(err) => err,
            };
            if !err.kind.is_retryable() || attempt >= max_attempts {
                engine_warn!("fetch {} failed after {} attempt(s): {}", url, attempt, err);
                return Err(err);
            }
            let delay = self.retry.delay_after(attempt);
            engine_debug!(
                "fetch {} attempt {}/{} failed ({}), retrying in {:?}",
                url,
                attempt,
                max_attempts,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &Url, options: &FetchOptions) -> Result<FetchedMedia, FetchError> {
        match tokio::time::timeout(options.timeout, self.run_chain(url, options)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::new(
                FailureKind::Timeout,
                format!("no response within {:?}", options.timeout),
            )),
        }
    }

    async fn run_chain(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<FetchedMedia, FetchError> {
        let mut last_error = FetchError::new(FailureKind::Network, "no fetch strategy configured");
        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.fetch(url, options).await {
                Ok(media) => return Ok(media),
                Err(err) => {
                    let has_next = index + 1 < self.strategies.len();
                    if !err.kind.is_blocked() || !has_next {
                        return Err(err);
                    }
                    engine_debug!(
                        "{} strategy blocked for {} ({}), escalating",
                        strategy.name(),
                        url,
                        err
                    );
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// Fetch `urls` in waves of at most `concurrency`, emitting one
    /// [`ArchiveEvent::MediaFetched`] per settled item.
    pub async fn fetch_batch(
        &self,
        urls: &[String],
        concurrency: usize,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> BatchFetchReport {
        let total = urls.len();
        let mut report = BatchFetchReport::default();
        let mut completed = 0;

        for wave in urls.chunks(concurrency.max(1)) {
            let settled = join_all(wave.iter().map(|url| async move {
                (url.clone(), self.fetch_one(url, options).await)
            }))
            .await;

            for (url, result) in settled {
                completed += 1;
                let succeeded = result.is_ok();
                if succeeded {
                    report.succeeded += 1;
                } else {
                    report.failed += 1;
                }
                sink.emit(ArchiveEvent::MediaFetched {
                    url: url.clone(),
                    succeeded,
                    completed,
                    total,
                });
                report.results.insert(url, result);
            }
        }

        engine_debug!(
            "media batch settled: {} ok, {} failed",
            report.succeeded,
            report.failed
        );
        report
    }
}

fn parse_media_url(url: &str) -> Result<Url, FetchError> {
    let parsed =
        Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::new(
            FailureKind::InvalidUrl,
            format!("unsupported scheme {other}"),
        )),
    }
}
