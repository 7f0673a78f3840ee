//! Request descriptors for the Admin REST API.
//!
//! An [`HttpRequest`] describes one logical request: verb, path, query, body
//! and the per-request knobs (attempt cap, exchange timeout, overall deadline,
//! idempotency key). It is handed to the client by value and not retained
//! once the call completes.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::clients::errors::InvalidHttpRequestError;
use crate::clients::retry::RetrySafety;

/// Header carrying a caller-supplied idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// HTTP methods supported by the Admin REST API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// Retrieve a resource or a page of resources.
    Get,
    /// Create a resource.
    Post,
    /// Update a resource.
    Put,
    /// Remove a resource.
    Delete,
}

impl HttpMethod {
    /// Returns `true` for verbs that are safe to repeat without a key.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A request to be executed against the Admin REST API.
///
/// Use [`HttpRequest::builder`] to construct requests.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_catalog::clients::{HttpMethod, HttpRequest};
/// use serde_json::json;
///
/// let list = HttpRequest::builder(HttpMethod::Get, "products")
///     .query_param("limit", "50")
///     .timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert!(list.http_method.is_idempotent());
///
/// let create = HttpRequest::builder(HttpMethod::Post, "products")
///     .body(json!({"product": {"title": "Board"}}))
///     .idempotency_key("create-board-1")
///     .build()
///     .unwrap();
/// assert_eq!(create.idempotency_key.as_deref(), Some("create-board-1"));
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub http_method: HttpMethod,
    /// The path relative to `/admin/api/{version}/`, without `.json`.
    pub path: String,
    /// The JSON request body, if any.
    pub body: Option<serde_json::Value>,
    /// Query parameters to append to the URL.
    pub query: Option<HashMap<String, String>>,
    /// Additional headers to include in the request.
    pub extra_headers: Option<HashMap<String, String>>,
    /// Attempt cap overriding the client's retry policy.
    pub tries: Option<u32>,
    /// Deadline for each individual exchange, overriding the client default.
    pub timeout: Option<Duration>,
    /// Budget for the whole logical request, retries and waits included.
    pub deadline: Option<Duration>,
    /// Caller-supplied key making a mutation safe to retry.
    pub idempotency_key: Option<String>,
}

impl HttpRequest {
    /// Creates a new builder for an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if:
    /// - `http_method` is `Post` or `Put` but `body` is `None`
    /// - `path` is empty apart from slashes and a `.json` suffix
    /// - `tries` is `Some(0)`
    /// - `idempotency_key` is blank
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if matches!(self.http_method, HttpMethod::Post | HttpMethod::Put) && self.body.is_none() {
            return Err(InvalidHttpRequestError::MissingBody {
                method: self.http_method.to_string(),
            });
        }

        if self.normalized_path().is_empty() {
            return Err(InvalidHttpRequestError::EmptyPath);
        }

        if self.tries == Some(0) {
            return Err(InvalidHttpRequestError::ZeroTries);
        }

        if self
            .idempotency_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(InvalidHttpRequestError::EmptyIdempotencyKey);
        }

        Ok(())
    }

    /// Returns the path without surrounding slashes or a `.json` suffix.
    #[must_use]
    pub fn normalized_path(&self) -> &str {
        let path = self.path.trim_matches('/');
        path.strip_suffix(".json").unwrap_or(path)
    }

    /// Returns how the retry policy must treat failures of this request.
    ///
    /// GET is always idempotent. Mutations become retry-safe only when the
    /// caller supplied an idempotency key.
    #[must_use]
    pub const fn retry_safety(&self) -> RetrySafety {
        if self.http_method.is_idempotent() || self.idempotency_key.is_some() {
            RetrySafety::Idempotent
        } else {
            RetrySafety::NonIdempotent
        }
    }
}

/// Builder for [`HttpRequest`].
#[derive(Debug)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            request: HttpRequest {
                http_method: method,
                path: path.into(),
                body: None,
                query: None,
                extra_headers: None,
                tries: None,
                timeout: None,
                deadline: None,
                idempotency_key: None,
            },
        }
    }

    /// Sets the JSON request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Sets all query parameters at once.
    #[must_use]
    pub fn query(mut self, query: HashMap<String, String>) -> Self {
        self.request.query = Some(query);
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .query
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Adds a single extra header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Overrides the retry policy's attempt cap for this request.
    #[must_use]
    pub const fn tries(mut self, tries: u32) -> Self {
        self.request.tries = Some(tries);
        self
    }

    /// Overrides the per-exchange timeout for this request.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = Some(timeout);
        self
    }

    /// Bounds the whole logical request, including retries and waits.
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.request.deadline = Some(deadline);
        self
    }

    /// Attaches an idempotency key, making a mutation retry-safe.
    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.request.idempotency_key = Some(key.into());
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        self.request.verify()?;
        Ok(self.request)
    }
}
