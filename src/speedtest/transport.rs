//! HTTP transport used by every measurement.
//!
//! The engine only talks to the [`Transport`] trait so tests can swap in an
//! in-memory implementation. [`ReqwestTransport`] is the real one.

use crate::speedtest::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use http::StatusCode;
use log::debug;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streamed response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

pub struct TransportResponse {
    pub status: StatusCode,
    /// Final URL after redirects.
    pub url: String,
    pub body: ByteStream,
}

impl TransportResponse {
    /// Turn a non-success status into an error.
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(TransportError::new(self.url, format!("HTTP status {}", self.status)))
        }
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        self.body
            .try_fold(Vec::new(), |mut content, chunk| async move {
                content.extend_from_slice(&chunk);
                Ok(content)
            })
            .await
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Network settings for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Use https for scheme-relative URLs.
    pub secure: bool,
    /// Local address to bind outgoing connections to.
    pub source: Option<IpAddr>,
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self { secure: false, source: None, timeout: DEFAULT_TIMEOUT }
    }
}

/// Complete a scheme-relative URL (`://host/path` or `//host/path`).
///
/// Absolute URLs are returned unchanged.
pub fn resolve_url(url: &str, secure: bool) -> String {
    let scheme = if secure { "https" } else { "http" };

    if url.starts_with("://") {
        format!("{}{}", scheme, url)
    } else if url.starts_with("//") {
        format!("{}:{}", scheme, url)
    } else {
        url.to_string()
    }
}

pub fn user_agent() -> String {
    format!(
        "Mozilla/5.0 ({}; U; {}; en-us) {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        NAME,
        VERSION
    )
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    secure: bool,
}

impl ReqwestTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let mut builder = ReqwestClient::builder()
            .user_agent(user_agent())
            .timeout(options.timeout)
            .connect_timeout(options.timeout);

        if let Some(source) = options.source {
            builder = builder.local_address(source);
        }

        let client =
            builder.build().map_err(|e| TransportError::from_reqwest("", e))?;

        Ok(Self { client, secure: options.secure })
    }

    fn parse_url(&self, url: &str) -> Result<Url, TransportError> {
        let resolved = resolve_url(url, self.secure);
        Url::parse(&resolved)
            .map_err(|e| TransportError::new(resolved.as_str(), e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let url = self.parse_url(url)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        Ok(into_transport_response(response))
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        let url = self.parse_url(url)?;
        debug!("POST {} ({} bytes)", url, body.len());

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, "no-cache")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url.as_str(), e))?;

        Ok(into_transport_response(response))
    }
}

fn into_transport_response(response: reqwest::Response) -> TransportResponse {
    let status = response.status();
    let url = response.url().to_string();
    let stream_url = url.clone();

    let body = response
        .bytes_stream()
        .map_err(move |e| TransportError::from_reqwest(&stream_url, e))
        .boxed();

    TransportResponse { status, url, body }
}
