use std::error::Error as StdError;
use thiserror::Error;

/// A failure to reach a remote endpoint or to read its response.
///
/// Cloneable so a single outcome can be handed to every waiter of a cached
/// load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{url}] {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
    pub timeout: bool,
}

impl TransportError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self { url: url.into(), message: message.into(), timeout: false }
    }

    pub fn timed_out(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self { timeout: true, ..Self::new(url, message) }
    }

    /// Keep the message of `error` and of every error beneath it.
    pub fn chained(url: impl Into<String>, error: &(dyn StdError + 'static)) -> Self {
        Self::new(url, error_chain(error))
    }

    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = error.url().map(|u| u.to_string()).unwrap_or_else(|| url.to_string());
        let timeout = error.is_timeout();
        Self { timeout, ..Self::chained(url, &error) }
    }
}

/// Messages along the `source()` chain, outermost first, joined by `": "`.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }

    message
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to decode {resource}: {message}")]
    Decode { resource: &'static str, message: String },

    #[error("no servers available")]
    NoServersAvailable,

    #[error("server not found: {0}")]
    ServerNotFound(u64),
}

impl FetchError {
    pub fn decode(resource: &'static str, error: impl std::fmt::Display) -> Self {
        FetchError::Decode { resource, message: error.to_string() }
    }

    /// Name the URL a document came from in a decode failure.
    pub fn with_url(self, url: &str) -> Self {
        match self {
            FetchError::Decode { resource, message } => {
                FetchError::Decode { resource, message: format!("{} (from {})", message, url) }
            }
            other => other,
        }
    }
}
