//! Error types for a single HTTP exchange.
//!
//! - [`HttpResponseError`]: a non-2xx response, with its serialized error body
//! - [`HttpError`]: every way one exchange can fail
//! - [`InvalidHttpRequestError`]: a request rejected before anything is sent
//! - [`ErrorKind`]: the classification the retry policy decides on
//!
//! Errors for a whole logical request (retries, pagination, decoding) live in
//! [`crate::rest::ResourceError`].

use std::time::Duration;

use thiserror::Error;

use crate::clients::http_response::HttpResponse;

/// Error returned when an exchange receives a non-successful response.
///
/// The `message` field holds a compact JSON object built from the response's
/// `errors`, `error` and `error_description` fields plus an `error_reference`
/// naming the `X-Request-Id`.
///
/// # Example
///
/// ```rust
/// use shopify_catalog::clients::HttpResponseError;
///
/// let error = HttpResponseError {
///     code: 404,
///     message: r#"{"errors":"Not Found"}"#.to_string(),
///     error_reference: Some("abc-123".to_string()),
///     body: r#"{"errors":"Not Found"}"#.to_string(),
/// };
/// assert_eq!(error.to_string(), r#"{"errors":"Not Found"}"#);
/// ```
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Serialized error message in JSON format.
    pub message: String,
    /// The `X-Request-Id` of the failing exchange.
    pub error_reference: Option<String>,
    /// The raw response body.
    pub body: String,
}

impl HttpResponseError {
    /// Builds the error from a non-2xx response.
    #[must_use]
    pub fn from_response(response: &HttpResponse) -> Self {
        Self {
            code: response.code,
            message: serialize_error(response),
            error_reference: response.request_id().map(String::from),
            body: response.body.clone(),
        }
    }
}

/// Serializes the interesting parts of an error body into a JSON string.
fn serialize_error(response: &HttpResponse) -> String {
    let body = response.json().unwrap_or_default();
    let mut error_body = serde_json::Map::new();

    if let Some(errors) = body.get("errors") {
        error_body.insert("errors".to_string(), errors.clone());
    }
    if let Some(error) = body.get("error") {
        error_body.insert("error".to_string(), error.clone());
        if let Some(desc) = body.get("error_description") {
            error_body.insert("error_description".to_string(), desc.clone());
        }
    }

    if let Some(request_id) = response.request_id() {
        error_body.insert(
            "error_reference".to_string(),
            serde_json::json!(format!(
                "If you report this error, please include this id: {request_id}."
            )),
        );
    }

    serde_json::to_string(&error_body).unwrap_or_else(|_| "{}".to_string())
}

/// Error returned when a request fails validation before it is sent.
///
/// # Example
///
/// ```rust
/// use shopify_catalog::clients::InvalidHttpRequestError;
///
/// let error = InvalidHttpRequestError::MissingBody {
///     method: "post".to_string(),
/// };
/// assert_eq!(error.to_string(), "Cannot use post without specifying data.");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The path was empty once slashes and the `.json` suffix were removed.
    #[error("Request path must not be empty.")]
    EmptyPath,

    /// The request allowed zero attempts.
    #[error("A request must allow at least one attempt.")]
    ZeroTries,

    /// The idempotency key was blank.
    #[error("Idempotency key must not be empty.")]
    EmptyIdempotencyKey,
}

/// Every way a single HTTP exchange can fail.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The connection failed or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The exchange exceeded its own deadline.
    #[error("Exchange timed out after {0:?}")]
    Timeout(Duration),

    /// The server rejected the call with HTTP 429.
    #[error("Rate limited by the server: {error}")]
    RateLimited {
        /// Delay requested by `Retry-After`, if sent.
        retry_after: Option<Duration>,
        /// The rejected response.
        #[source]
        error: HttpResponseError,
    },

    /// The server answered with a 5xx status.
    #[error("Server error {}: {}", .0.code, .0.message)]
    Server(HttpResponseError),

    /// The server answered with a 4xx status other than 429.
    #[error(transparent)]
    Response(HttpResponseError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),
}

impl HttpError {
    /// Classifies the failure for the retry policy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) => ErrorKind::Transport {
                connect: e.is_connect(),
                timed_out: e.is_timeout(),
            },
            Self::Timeout(_) => ErrorKind::Transport {
                connect: false,
                timed_out: true,
            },
            Self::RateLimited { retry_after, .. } => ErrorKind::RateLimited {
                retry_after: *retry_after,
            },
            Self::Server(e) => ErrorKind::Server(e.code),
            Self::Response(e) => ErrorKind::Client(e.code),
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    /// Returns the HTTP status code, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { error, .. } | Self::Server(error) | Self::Response(error) => {
                Some(error.code)
            }
            _ => None,
        }
    }

    /// Returns the `X-Request-Id` of the exchange, if a response was received.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::RateLimited { error, .. } | Self::Server(error) | Self::Response(error) => {
                error.error_reference.as_deref()
            }
            _ => None,
        }
    }
}

/// The classification of a failure that the retry policy decides on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network-level failure.
    Transport {
        /// The connection could not be established, so the request never
        /// reached the server.
        connect: bool,
        /// The exchange ran past its deadline.
        timed_out: bool,
    },
    /// HTTP 429.
    RateLimited {
        /// Delay requested by `Retry-After`.
        retry_after: Option<Duration>,
    },
    /// HTTP 5xx.
    Server(u16),
    /// HTTP 4xx other than 429.
    Client(u16),
    /// The payload did not match the expected shape.
    Malformed,
    /// The caller cancelled the request.
    Cancelled,
    /// The request was rejected before it was sent.
    InvalidRequest,
}

impl ErrorKind {
    /// Returns `true` for kinds that may succeed on another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::RateLimited { .. } | Self::Server(_)
        )
    }
}
