//! Retrying, rate-limited REST client.
//!
//! [`RestClient`] is the execution engine behind the
//! [`Resource`](crate::rest::Resource) façade. Each call to
//! [`RestClient::execute`] runs one logical request:
//!
//! 1. wait for a permit from the shop's governor
//! 2. perform one exchange with its own timeout
//! 3. reconcile the permit with the `X-Shopify-Shop-Api-Call-Limit` header
//! 4. on failure, ask the retry policy whether to go again
//!
//! Waiting for a permit or a backoff is aborted by the request's
//! [`CancellationToken`](crate::clients::CancellationToken).

mod client;

pub use client::RestClient;
