//! Errors for logical resource requests.
//!
//! A logical request (fetch one, fetch a page, create, ...) may expand into
//! several exchanges. Transient failures are absorbed by the retry policy;
//! whatever reaches the caller is a [`ResourceError`] carrying a
//! [`RequestContext`] (resource, method, path, attempts made).
//!
//! Status mapping for terminal responses:
//!
//! - **404**: [`ResourceError::NotFound`]
//! - **422**: [`ResourceError::ValidationFailed`] with the field errors
//! - **Other 4xx**: [`ResourceError::Client`]
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_catalog::rest::{Resource, ResourceError};
//! use shopify_catalog::rest::resources::Product;
//!
//! match Product::fetch_one(&client, 123, None, &cancel).await {
//!     Ok(response) => println!("Found: {:?}", response.title),
//!     Err(ResourceError::NotFound { id, .. }) => println!("no product {id}"),
//!     Err(ResourceError::ValidationFailed { errors, .. }) => {
//!         for (field, messages) in errors {
//!             println!("{field}: {messages:?}");
//!         }
//!     }
//!     Err(ResourceError::RetriesExhausted { context, last }) => {
//!         println!("gave up after {} attempts: {last}", context.attempts);
//!     }
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::clients::{ErrorKind, HttpError, HttpMethod, HttpResponseError, InvalidHttpRequestError};
use crate::rest::codec::CodecError;

/// The resource a logical request is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceContext {
    /// Singular resource name, e.g. `"Product"`.
    pub resource: &'static str,
    /// The addressed record's id, if any.
    pub id: Option<String>,
}

impl ResourceContext {
    /// Creates a context for a collection-level request.
    #[must_use]
    pub const fn new(resource: &'static str) -> Self {
        Self { resource, id: None }
    }

    /// Names the record the request addresses.
    #[must_use]
    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

/// Diagnostic context attached to every [`ResourceError`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// Singular resource name.
    pub resource: &'static str,
    /// HTTP verb of the request.
    pub method: HttpMethod,
    /// Request path relative to the versioned base.
    pub path: String,
    /// Exchanges attempted before the request resolved.
    pub attempts: u32,
}

impl RequestContext {
    /// Creates a context for a request that has not been attempted yet.
    #[must_use]
    pub fn new(resource: &'static str, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            resource,
            method,
            path: path.into(),
            attempts: 0,
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {} attempt{})",
            self.method.to_string().to_uppercase(),
            self.path,
            self.resource,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" }
        )
    }
}

/// Error returned by a logical resource request.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The record does not exist (HTTP 404).
    #[error("{} with id {id} not found", .context.resource)]
    NotFound {
        /// The id that was looked up.
        id: String,
        /// `X-Request-Id` of the failing exchange.
        request_id: Option<String>,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// The server rejected the payload (HTTP 422).
    #[error("Validation failed: {errors:?}")]
    ValidationFailed {
        /// Field name to messages; array and string forms land under `base`.
        errors: HashMap<String, Vec<String>>,
        /// `X-Request-Id` of the failing exchange.
        request_id: Option<String>,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// Any other 4xx except 429.
    #[error("Client error {} for {context}: {source}", .source.code)]
    Client {
        /// The rejected response.
        source: HttpResponseError,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// The response body did not match the resource's shape.
    #[error("Malformed response for {context}: {source}")]
    Malformed {
        /// The decoding failure.
        source: CodecError,
        /// `X-Request-Id` of the exchange that returned the payload.
        request_id: Option<String>,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// Transient failures continued until the attempt cap or deadline.
    #[error("Retries exhausted for {context}: {last}")]
    RetriesExhausted {
        /// The failure of the final attempt.
        #[source]
        last: HttpError,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// A transient failure that is unsafe to retry for this request, such
    /// as a timed-out POST without an idempotency key.
    #[error("Not retried for {context}: {source}")]
    NotRetried {
        /// The failure.
        source: HttpError,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// The caller cancelled the request.
    #[error("Request cancelled: {context}")]
    Cancelled {
        /// Request diagnostics.
        context: RequestContext,
    },

    /// No path in the resource's table matches the supplied ids.
    #[error("Cannot resolve path for {resource}::{operation} with provided IDs")]
    PathResolutionFailed {
        /// The resource name.
        resource: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The request failed validation before anything was sent.
    #[error("Invalid request for {context}: {source}")]
    InvalidRequest {
        /// The validation failure.
        source: InvalidHttpRequestError,
        /// Request diagnostics.
        context: RequestContext,
    },

    /// Query parameters could not be serialized.
    #[error("Invalid parameters for {resource}: {reason}")]
    InvalidParams {
        /// The resource name.
        resource: &'static str,
        /// The serialization failure.
        reason: String,
    },
}

impl ResourceError {
    /// Maps a terminal, non-transient exchange failure to a resource error.
    #[must_use]
    pub fn from_http_error(error: HttpError, context: RequestContext, id: Option<&str>) -> Self {
        match error {
            HttpError::Response(response) => match response.code {
                404 => Self::NotFound {
                    id: id.unwrap_or("unknown").to_string(),
                    request_id: response.error_reference,
                    context,
                },
                422 => {
                    let body = serde_json::from_str(&response.body).unwrap_or_default();
                    Self::ValidationFailed {
                        errors: parse_validation_errors(&body),
                        request_id: response.error_reference,
                        context,
                    }
                }
                _ => Self::Client {
                    source: response,
                    context,
                },
            },
            HttpError::InvalidRequest(source) => Self::InvalidRequest { source, context },
            other => Self::NotRetried {
                source: other,
                context,
            },
        }
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::Client(404),
            Self::ValidationFailed { .. } => ErrorKind::Client(422),
            Self::Client { source, .. } => ErrorKind::Client(source.code),
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::RetriesExhausted { last, .. } => last.kind(),
            Self::NotRetried { source, .. } => source.kind(),
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::PathResolutionFailed { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidParams { .. } => ErrorKind::InvalidRequest,
        }
    }

    /// Returns the request diagnostics, if the error came from a request.
    #[must_use]
    pub const fn context(&self) -> Option<&RequestContext> {
        match self {
            Self::NotFound { context, .. }
            | Self::ValidationFailed { context, .. }
            | Self::Client { context, .. }
            | Self::Malformed { context, .. }
            | Self::RetriesExhausted { context, .. }
            | Self::NotRetried { context, .. }
            | Self::Cancelled { context }
            | Self::InvalidRequest { context, .. } => Some(context),
            Self::PathResolutionFailed { .. } | Self::InvalidParams { .. } => None,
        }
    }

    /// Returns the number of exchanges attempted (zero if none was sent).
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.context().map_or(0, |context| context.attempts)
    }

    /// Returns the `X-Request-Id` of the failing exchange, if known.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::NotFound { request_id, .. }
            | Self::ValidationFailed { request_id, .. }
            | Self::Malformed { request_id, .. } => request_id.as_deref(),
            Self::Client { source, .. } => source.error_reference.as_deref(),
            Self::RetriesExhausted { last, .. } => last.request_id(),
            Self::NotRetried { source, .. } => source.request_id(),
            _ => None,
        }
    }
}

/// Parses the `errors` field of a 422 body.
///
/// Accepts `{"field": ["msg", ...]}`, `["msg", ...]` and `"msg"`; the last
/// two forms are stored under `base`.
fn parse_validation_errors(body: &serde_json::Value) -> HashMap<String, Vec<String>> {
    let mut result = HashMap::new();

    let strings = |arr: &[serde_json::Value]| -> Vec<String> {
        arr.iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect()
    };

    match body.get("errors") {
        Some(serde_json::Value::Object(map)) => {
            for (field, messages) in map {
                let msgs = match messages {
                    serde_json::Value::Array(arr) => strings(arr),
                    serde_json::Value::String(s) => vec![s.clone()],
                    _ => vec![messages.to_string()],
                };
                result.insert(field.clone(), msgs);
            }
        }
        Some(serde_json::Value::Array(arr)) => {
            let msgs = strings(arr);
            if !msgs.is_empty() {
                result.insert("base".to_string(), msgs);
            }
        }
        Some(serde_json::Value::String(s)) => {
            result.insert("base".to_string(), vec![s.clone()]);
        }
        _ => {}
    }

    result
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceError>();
};
