//! In-memory [`Transport`] for unit tests.

use crate::speedtest::error::TransportError;
use crate::speedtest::transport::{ByteStream, Transport, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    Body(Vec<u8>),
    Status(StatusCode),
    Fail(String),
    /// Never-ending body yielding `chunk` bytes every `interval`.
    Endless { chunk: usize, interval: Duration },
}

#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<String, MockReply>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn route(self, url: &str, reply: MockReply) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    pub fn with_body(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.route(url, MockReply::Body(body.into()))
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.route(url, MockReply::Fail(message.to_string()))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests whose URL starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.starts_with(prefix)).count()
    }

    async fn respond(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let key = url.split('?').next().unwrap_or(url);
        let reply = self.routes.lock().unwrap().get(key).cloned();

        let (status, body): (StatusCode, ByteStream) = match reply {
            None => return Err(TransportError::new(url, "connection refused")),
            Some(MockReply::Fail(message)) => {
                return Err(TransportError::new(url, message))
            }
            Some(MockReply::Status(status)) => (status, stream::empty().boxed()),
            Some(MockReply::Body(body)) => (
                StatusCode::OK,
                stream::iter(vec![Ok(Bytes::from(body))]).boxed(),
            ),
            Some(MockReply::Endless { chunk, interval }) => (
                StatusCode::OK,
                stream::unfold((), move |_| async move {
                    tokio::time::sleep(interval).await;
                    Some((Ok(Bytes::from(vec![0u8; chunk])), ()))
                })
                .boxed(),
            ),
        };

        Ok(TransportResponse { status, url: url.to_string(), body })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        self.respond(url).await
    }

    async fn post(
        &self,
        url: &str,
        _content_type: &str,
        _body: Vec<u8>,
    ) -> Result<TransportResponse, TransportError> {
        self.respond(url).await
    }
}
