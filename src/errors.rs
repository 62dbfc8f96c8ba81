//! User-facing errors for the command line.
//!
//! Wraps the engine's [`FetchError`] with a category, an exit code and, where
//! it helps, a hint on how to fix things.

use crate::speedtest::error::{FetchError, TransportError};
use std::error::Error;
use std::fmt;

/// Exit codes for the application.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Network error (connection failed, timeout, etc.).
    pub const NETWORK_ERROR: i32 = 1;
    /// speedtest.net answered with an error or an unreadable document.
    pub const API_ERROR: i32 = 2;
    /// Configuration error (invalid arguments).
    pub const CONFIG_ERROR: i32 = 3;
    /// No usable server, or the requested one does not exist.
    pub const SERVER_ERROR: i32 = 4;
    /// Unknown/unexpected error.
    pub const UNKNOWN_ERROR: i32 = 99;
}

/// Categories of errors that can occur during speed testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network connectivity issues.
    Network,
    /// DNS resolution failures.
    Dns,
    /// Connection timeout.
    Timeout,
    /// TLS/SSL handshake failures.
    Tls,
    /// Remote endpoint returned an error status.
    Api,
    /// A document could not be decoded.
    Decode,
    /// Every server list mirror came back empty.
    NoServers,
    /// The requested server id is not in the catalog.
    ServerNotFound,
    /// Invalid configuration or arguments.
    Config,
    /// Unknown or unexpected errors.
    Unknown,
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Network => exit_codes::NETWORK_ERROR,
            ErrorKind::Dns => exit_codes::NETWORK_ERROR,
            ErrorKind::Timeout => exit_codes::NETWORK_ERROR,
            ErrorKind::Tls => exit_codes::NETWORK_ERROR,
            ErrorKind::Api => exit_codes::API_ERROR,
            ErrorKind::Decode => exit_codes::API_ERROR,
            ErrorKind::NoServers => exit_codes::SERVER_ERROR,
            ErrorKind::ServerNotFound => exit_codes::SERVER_ERROR,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Unknown => exit_codes::UNKNOWN_ERROR,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Network error",
            ErrorKind::Dns => "DNS resolution error",
            ErrorKind::Timeout => "Connection timeout",
            ErrorKind::Tls => "TLS/SSL error",
            ErrorKind::Api => "API error",
            ErrorKind::Decode => "Invalid response",
            ErrorKind::NoServers => "No servers available",
            ErrorKind::ServerNotFound => "Server not found",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Unknown => "Unknown error",
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Network => Some("Check your internet connection and try again."),
            ErrorKind::Dns => {
                Some("Check your DNS settings or try using a different DNS server.")
            }
            ErrorKind::Timeout => Some(
                "The server may be slow or unreachable. Try again later or raise --timeout.",
            ),
            ErrorKind::Tls => Some(
                "There may be a certificate issue. Check your system time or retry without --secure.",
            ),
            ErrorKind::Api | ErrorKind::Decode => {
                Some("speedtest.net may be experiencing issues. Try again later.")
            }
            ErrorKind::NoServers => {
                Some("None of the server list mirrors answered. Try again later.")
            }
            ErrorKind::ServerNotFound => {
                Some("Run with --list to see available server ids.")
            }
            ErrorKind::Config | ErrorKind::Unknown => None,
        }
    }
}

/// A user-friendly error type for speed test operations.
#[derive(Debug)]
pub struct SpeedTestError {
    pub kind: ErrorKind,
    /// User-friendly error message.
    pub message: String,
    /// Optional suggestion for how to resolve the error.
    pub suggestion: Option<String>,
    /// The underlying error, if any.
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl SpeedTestError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, source: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(
        mut self,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// An error of `kind` carrying that kind's default suggestion.
    fn classified(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self::new(kind, message);
        match kind.suggestion() {
            Some(suggestion) => error.with_suggestion(suggestion),
            None => error,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

impl fmt::Display for SpeedTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

impl Error for SpeedTestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<TransportError> for SpeedTestError {
    fn from(error: TransportError) -> Self {
        let kind = if error.timeout { ErrorKind::Timeout } else { classify_error(&error) };
        Self::classified(kind, error.to_string()).with_source(error)
    }
}

impl From<FetchError> for SpeedTestError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Transport(inner) => inner.into(),
            FetchError::Decode { .. } => {
                Self::classified(ErrorKind::Decode, error.to_string()).with_source(error)
            }
            FetchError::NoServersAvailable => Self::classified(
                ErrorKind::NoServers,
                "could not retrieve any server list",
            )
            .with_source(error),
            FetchError::ServerNotFound(id) => Self::classified(
                ErrorKind::ServerNotFound,
                format!("no server with id {}", id),
            )
            .with_source(error),
        }
    }
}

/// Classify an error into an ErrorKind based on its message.
pub fn classify_error(error: &dyn Error) -> ErrorKind {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("dns")
        || error_str.contains("resolve")
        || error_str.contains("no such host")
    {
        return ErrorKind::Dns;
    }

    if error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("deadline")
    {
        return ErrorKind::Timeout;
    }

    if error_str.contains("tls")
        || error_str.contains("ssl")
        || error_str.contains("certificate")
        || error_str.contains("handshake")
    {
        return ErrorKind::Tls;
    }

    if error_str.contains("connection refused")
        || error_str.contains("connection reset")
        || error_str.contains("network unreachable")
        || error_str.contains("host unreachable")
        || error_str.contains("no route")
        || error_str.contains("broken pipe")
        || error_str.contains("error sending request")
    {
        return ErrorKind::Network;
    }

    if error_str.contains("http status 4") || error_str.contains("http status 5") {
        return ErrorKind::Api;
    }

    ErrorKind::Unknown
}

/// Format an error for user display.
pub fn format_error_for_display(error: &SpeedTestError) -> String {
    let mut output = format!("Error: {}", error.message);

    if let Some(ref suggestion) = error.suggestion {
        output.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    output
}
