//! HTTP client layer for the Shopify Admin REST API.
//!
//! # Overview
//!
//! - [`HttpClient`]: performs one exchange and classifies its status
//! - [`HttpRequest`] / [`HttpResponse`]: request descriptor and parsed response
//! - [`RateLimitGovernor`]: per-shop throttle fed by the call-limit header
//! - [`RetryPolicy`]: pure retry decisions with jittered exponential backoff
//! - [`CancellationToken`]: aborts waits and discards in-flight results
//! - [`RestClient`]: combines all of the above into one logical request
//!
//! # Retry Behavior
//!
//! - **Transport failures**: retried with backoff; for requests without an
//!   idempotency key only when the connection was never established
//! - **429**: retried after `Retry-After`; the governor blocks the whole shop
//!   meanwhile
//! - **5xx**: retried with backoff
//! - **Other 4xx, malformed payloads, cancellation**: never retried
//!
//! The attempt cap defaults to 5 and can be set per client through
//! [`ClientConfig`](crate::ClientConfig) or per request with
//! [`HttpRequestBuilder::tries`].

mod cancel;
mod errors;
mod governor;
mod http_client;
mod http_request;
mod http_response;
pub mod rest;
mod retry;

pub use cancel::CancellationToken;
pub use errors::{ErrorKind, HttpError, HttpResponseError, InvalidHttpRequestError};
pub use governor::{
    Cancelled, GovernorConfig, GovernorSnapshot, Permit, RateLimitGovernor,
    DEFAULT_BACKOFF_CEILING, DEFAULT_BACKOFF_FLOOR, DEFAULT_LEAK_RATE, DEFAULT_MIN_INTERVAL,
};
pub use http_client::{HttpClient, SDK_VERSION};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder, IDEMPOTENCY_KEY_HEADER};
pub use http_response::{ApiCallLimit, HttpResponse, PageCursor, PaginationInfo, CALL_LIMIT_HEADER};
pub use retry::{
    RetryDecision, RetryPolicy, RetrySafety, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY,
    DEFAULT_MAX_TRIES,
};

pub use rest::RestClient;
