use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use url::Url;

use super::{FetchOptions, FetchStrategy, FetchedMedia, MediaFormat};
use crate::{FailureKind, FetchError};

/// What the relay is asked to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub url: String,
    pub max_bytes: u64,
    pub timeout: Duration,
}

/// Payload travels base64-encoded so it survives text-only transports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayResponse {
    pub ok: bool,
    /// Upstream HTTP status, `0` when the relay never reached the origin.
    pub status: u16,
    pub content_type: Option<String>,
    pub final_url: Option<String>,
    pub payload_base64: Option<String>,
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn success(payload: &[u8], content_type: Option<&str>) -> Self {
        Self {
            ok: true,
            status: 200,
            content_type: content_type.map(str::to_string),
            final_url: None,
            payload_base64: Some(STANDARD.encode(payload)),
            error: None,
        }
    }

    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("relay unavailable: {0}")]
    Unavailable(String),
    #[error("relay transport failed: {0}")]
    Transport(String),
}

/// A component able to perform requests outside the restrictions that apply
/// to the direct path (another process, a helper service, a browser
/// extension background context).
#[async_trait::async_trait]
pub trait PrivilegedRelay: Send + Sync {
    async fn relay(&self, request: RelayRequest) -> Result<RelayResponse, RelayError>;
}

pub struct RelayStrategy<R> {
    relay: R,
}

impl<R: PrivilegedRelay> RelayStrategy<R> {
    pub fn new(relay: R) -> Self {
        Self { relay }
    }
}

#[async_trait::async_trait]
impl<R: PrivilegedRelay> FetchStrategy for RelayStrategy<R> {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchedMedia, FetchError> {
        let request = RelayRequest {
            url: url.to_string(),
            max_bytes: options.max_bytes,
            timeout: options.timeout,
        };
        let response = self
            .relay
            .relay(request)
            .await
            .map_err(|err| FetchError::new(FailureKind::Relay, err.to_string()))?;

        if !response.ok {
            let message = response
                .error
                .unwrap_or_else(|| "relay reported failure".to_string());
            let kind = if response.status >= 400 {
                FailureKind::HttpStatus(response.status)
            } else {
                FailureKind::Relay
            };
            return Err(FetchError::new(kind, message));
        }

        let payload = response
            .payload_base64
            .ok_or_else(|| FetchError::new(FailureKind::Relay, "relay returned no payload"))?;
        let decoded = STANDARD
            .decode(payload.trim())
            .map_err(|err| FetchError::new(FailureKind::Relay, err.to_string()))?;
        let len = decoded.len() as u64;
        if len > options.max_bytes {
            return Err(FetchError::new(
                FailureKind::TooLarge {
                    max_bytes: options.max_bytes,
                    actual: Some(len),
                },
                "relay payload too large",
            ));
        }

        let final_url = response.final_url.unwrap_or_else(|| url.to_string());
        let format = MediaFormat::detect(url.as_str(), response.content_type.as_deref());
        Ok(FetchedMedia {
            bytes: Bytes::from(decoded),
            content_type: response.content_type,
            final_url,
            format,
        })
    }
}
