//! Error types for slashkit.
//!
//! Usage errors and controlled exits raised while parsing a command line never
//! surface here; the dispatcher recovers them and answers the user directly.
//! What remains are the failures a surrounding application must decide about:
//! Web API refusals, undeliverable response-URL posts, modal state errors and
//! transport problems.

use std::error;
use std::fmt;
use std::sync::Arc;

/// The main error type for slashkit.
#[derive(Clone, Debug)]
pub enum Error {
    /// The Web API answered `ok: false`.
    Api {
        /// The Web API method that was called, e.g. `chat.postMessage`.
        method: String,
        /// The error code returned by the API, e.g. `channel_not_found`.
        error: String,
        /// The full response body.
        response: serde_json::Value,
    },

    /// Authentication error.
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Rate limit exceeded.
    RateLimit {
        /// Human-readable error message.
        message: String,
        /// Time to wait before retrying, in seconds.
        retry_after: Option<u64>,
    },

    /// A Web API method answered with a non-success HTTP status.
    Status {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
    },

    /// A post to a response URL was not accepted.
    Delivery {
        /// The response URL that was posted to.
        url: String,
        /// HTTP status code returned.
        status_code: u16,
        /// Body returned alongside the status.
        body: String,
    },

    /// A modal or response operation was attempted without the context it needs.
    State {
        /// Human-readable error message.
        message: String,
    },

    /// Error during validation of caller-supplied data.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// API timeout error.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// Connection error.
    Connection {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// HTTP client error.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A URL parsing error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// An application handler failed.
    Handler {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new API error.
    pub fn api(
        method: impl Into<String>,
        error: impl Into<String>,
        response: serde_json::Value,
    ) -> Self {
        Error::Api {
            method: method.into(),
            error: error.into(),
            response,
        }
    }

    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new rate limit error.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Creates a new HTTP status error.
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Error::Status {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new delivery error.
    pub fn delivery(url: impl Into<String>, status_code: u16, body: impl Into<String>) -> Self {
        Error::Delivery {
            url: url.into(),
            status_code,
            body: body.into(),
        }
    }

    /// Creates a new state error.
    pub fn state(message: impl Into<String>) -> Self {
        Error::State {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new connection error.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new HTTP client error.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Creates a new handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Error::Handler {
            message: message.into(),
        }
    }

    /// Returns true if the Web API refused the call.
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api { .. })
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is related to rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// Returns true if a response-URL post was not accepted.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Error::Delivery { .. })
    }

    /// Returns true if this error is a state error.
    pub fn is_state(&self) -> bool {
        matches!(self, Error::State { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if this error is a connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status_code, .. } => Some(*status_code),
            Error::Delivery { status_code, .. } => Some(*status_code),
            Error::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns the Web API error code, if the API refused the call.
    pub fn api_error(&self) -> Option<&str> {
        match self {
            Error::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api { method, error, .. } => {
                write!(f, "API error: {method} failed: {error}")
            }
            Error::Authentication { message } => {
                write!(f, "Authentication error: {message}")
            }
            Error::RateLimit {
                message,
                retry_after,
            } => {
                if let Some(retry_after) = retry_after {
                    write!(
                        f,
                        "Rate limit exceeded: {message} (retry after {retry_after} seconds)"
                    )
                } else {
                    write!(f, "Rate limit exceeded: {message}")
                }
            }
            Error::Status {
                status_code,
                message,
            } => {
                write!(f, "HTTP {status_code}: {message}")
            }
            Error::Delivery {
                url,
                status_code,
                body,
            } => {
                write!(
                    f,
                    "Failed to send response_url: {url}: status={status_code}: {body}"
                )
            }
            Error::State { message } => {
                write!(f, "State error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "Connection error: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client error: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
            Error::Handler { message } => {
                write!(f, "Handler error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::HttpClient { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for slashkit operations.
pub type Result<T> = std::result::Result<T, Error>;
