use std::time::Duration;

use bytes::{Bytes, BytesMut};
use engine_logging::engine_trace;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use tokio::sync::OnceCell;
use url::Url;

use super::{FetchOptions, FetchStrategy, FetchedMedia, MediaFormat};
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct DirectSettings {
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: Option<String>,
}

impl Default for DirectSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
            user_agent: None,
        }
    }
}

/// Plain HTTP(S) download from the current process. The client is built on
/// first use and shared by every later request.
#[derive(Debug, Default)]
pub struct DirectStrategy {
    settings: DirectSettings,
    client: OnceCell<reqwest::Client>,
}

impl DirectStrategy {
    pub fn new(settings: DirectSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&reqwest::Client, FetchError> {
        self.client
            .get_or_try_init(|| async {
                let mut builder = reqwest::Client::builder()
                    .connect_timeout(self.settings.connect_timeout)
                    .redirect(reqwest::redirect::Policy::limited(self.settings.max_redirects));
                if let Some(agent) = &self.settings.user_agent {
                    builder = builder.user_agent(agent.as_str());
                }
                builder.build().map_err(|err| {
                    FetchError::new(FailureKind::Network, format!("http client: {err}"))
                })
            })
            .await
    }
}

#[async_trait::async_trait]
impl FetchStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchedMedia, FetchError> {
        let response = self
            .client()
            .await?
            .get(url.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{url} answered {status}"),
            ));
        }
        if let Some(declared) = response.content_length() {
            check_size(options.max_bytes, declared)?;
        }

        let final_url = response.url().to_string();
        let content_type = header_content_type(response.headers());
        let bytes = read_body(response, options.max_bytes).await?;
        engine_trace!("direct {} -> {} ({} bytes)", url, final_url, bytes.len());

        let format = MediaFormat::from_url(&final_url)
            .or_else(|| MediaFormat::detect(url.as_str(), content_type.as_deref()));
        Ok(FetchedMedia {
            bytes,
            content_type,
            final_url,
            format,
        })
    }
}

fn header_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)?
        .to_str()
        .ok()
        .map(str::to_string)
}

/// Collect the body, giving up as soon as it grows past `max_bytes`.
async fn read_body(response: reqwest::Response, max_bytes: u64) -> Result<Bytes, FetchError> {
    let mut body = BytesMut::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(transport_error)?;
        check_size(max_bytes, (body.len() + chunk.len()) as u64)?;
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

fn check_size(max_bytes: u64, actual: u64) -> Result<(), FetchError> {
    if actual <= max_bytes {
        return Ok(());
    }
    Err(FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        format!("{actual} bytes exceeds the {max_bytes} byte limit"),
    ))
}

fn transport_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}
