//! REST client for the Shopify Admin API.
//!
//! This module provides the [`RestClient`] type, which turns one logical
//! request into as many exchanges as its retry policy allows, each admitted
//! by the shop's [`RateLimitGovernor`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::clients::cancel::CancellationToken;
use crate::clients::errors::HttpError;
use crate::clients::governor::RateLimitGovernor;
use crate::clients::http_client::HttpClient;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::retry::{AttemptRecord, RetryDecision, RetryPolicy};
use crate::config::{ApiVersion, ClientConfig};
use crate::error::ConfigError;
use crate::rest::{RequestContext, ResourceContext, ResourceError};

/// Resource-fetching client for one shop.
///
/// Every exchange passes through the shop's [`RateLimitGovernor`] exactly
/// once and through the [`RetryPolicy`] whenever it fails. Clients built
/// with [`RestClient::new`] get a governor of their own; clients that talk
/// to the same shop concurrently should share one through
/// [`RestClient::with_governor`].
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`; share it by reference or `Arc` between
/// tasks.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use shopify_catalog::{AccessToken, ClientConfig, RestClient, ShopDomain};
/// use shopify_catalog::clients::RateLimitGovernor;
///
/// let config = ClientConfig::builder()
///     .shop(ShopDomain::new("my-store").unwrap())
///     .access_token(AccessToken::new("shpat_123").unwrap())
///     .build()
///     .unwrap();
///
/// let governor = Arc::new(RateLimitGovernor::new(config.governor().clone()));
/// let catalog = RestClient::with_governor(&config, Arc::clone(&governor)).unwrap();
/// let inventory = RestClient::with_governor(&config, governor).unwrap();
/// assert!(Arc::ptr_eq(catalog.governor(), inventory.governor()));
/// ```
#[derive(Debug)]
pub struct RestClient {
    http_client: HttpClient,
    governor: Arc<RateLimitGovernor>,
    retry_policy: RetryPolicy,
    api_version: ApiVersion,
    page_size: u32,
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a client with a governor of its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientInit`] if the HTTP transport cannot
    /// be created.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let governor = Arc::new(RateLimitGovernor::new(config.governor().clone()));
        Self::with_governor(config, governor)
    }

    /// Creates a client that shares `governor` with other clients of the
    /// same shop.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientInit`] if the HTTP transport cannot
    /// be created.
    pub fn with_governor(
        config: &ClientConfig,
        governor: Arc<RateLimitGovernor>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            governor,
            retry_policy: config.retry_policy().clone(),
            api_version: config.api_version().clone(),
            page_size: config.page_size(),
        })
    }

    /// Returns the API version used for requests.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the shop's rate-limit governor.
    #[must_use]
    pub const fn governor(&self) -> &Arc<RateLimitGovernor> {
        &self.governor
    }

    /// Returns the default retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the default page size for list requests.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Executes one logical request and returns its successful response.
    ///
    /// Each attempt waits for a governor permit, performs one exchange and
    /// reconciles the permit with the response's rate-limit header. Failed
    /// attempts go to the retry policy; non-retryable failures, exhausted
    /// attempts, an expired deadline and cancellation end the request.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] describing the terminal failure, with the
    /// number of attempts made in its [`RequestContext`].
    pub async fn execute(
        &self,
        request: HttpRequest,
        target: &ResourceContext,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ResourceError> {
        self.run(request, target, cancel)
            .await
            .map(|(response, _)| response)
    }

    /// Like [`execute`](Self::execute), also returning the diagnostics of
    /// the successful request so that decoding failures can report them.
    pub(crate) async fn run(
        &self,
        request: HttpRequest,
        target: &ResourceContext,
        cancel: &CancellationToken,
    ) -> Result<(HttpResponse, RequestContext), ResourceError> {
        let mut context = RequestContext::new(
            target.resource,
            request.http_method,
            request.normalized_path(),
        );

        if let Err(source) = request.verify() {
            return Err(ResourceError::InvalidRequest { source, context });
        }

        let policy = request.tries.map_or_else(
            || self.retry_policy.clone(),
            |tries| self.retry_policy.clone().with_max_tries(tries),
        );
        let safety = request.retry_safety();
        let exchange_timeout = request
            .timeout
            .unwrap_or_else(|| self.http_client.default_timeout());
        let deadline = request.deadline.map(|budget| Instant::now() + budget);
        let mut record = AttemptRecord::default();
        let mut last_error: Option<HttpError> = None;

        loop {
            let permit = tokio::select! {
                biased;
                acquired = self.governor.acquire(cancel) => match acquired {
                    Ok(permit) => permit,
                    Err(_) => return Err(ResourceError::Cancelled { context }),
                },
                () = sleep_until(deadline) => {
                    return Err(deadline_exceeded(context, last_error, request.deadline));
                }
            };

            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        drop(permit);
                        return Err(deadline_exceeded(context, last_error, request.deadline));
                    }
                    exchange_timeout.min(remaining)
                }
                None => exchange_timeout,
            };

            let attempt = record.begin();
            context.attempts = attempt;

            let outcome = self.http_client.send(&request, timeout).await;
            let result = match outcome {
                Ok(response) => {
                    if response.code == 429 {
                        permit.throttled(response.api_call_limit, response.retry_after);
                    } else {
                        permit.reconcile(response.api_call_limit);
                    }
                    HttpClient::check_status(response)
                }
                Err(error) => {
                    drop(permit);
                    Err(error)
                }
            };

            if cancel.is_cancelled() {
                tracing::debug!(%context, "Discarding result of cancelled request");
                return Err(ResourceError::Cancelled { context });
            }

            let error = match result {
                Ok(response) => return Ok((response, context)),
                Err(error) => error,
            };

            let kind = error.kind();
            match policy.decide(attempt, &kind, safety) {
                RetryDecision::Retry { delay } => {
                    if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
                        return Err(ResourceError::RetriesExhausted {
                            last: error,
                            context,
                        });
                    }

                    record.fail(kind, Some(delay));
                    tracing::debug!(
                        %context,
                        error = %error,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying request"
                    );
                    last_error = Some(error);

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            return Err(ResourceError::Cancelled { context });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::GiveUp => {
                    tracing::debug!(
                        %context,
                        error = %error,
                        previous = ?record.last_kind,
                        previous_delay = ?record.last_delay,
                        "Giving up on request"
                    );

                    if !kind.is_transient() {
                        return Err(ResourceError::from_http_error(
                            error,
                            context,
                            target.id.as_deref(),
                        ));
                    }
                    if attempt >= policy.max_tries() {
                        return Err(ResourceError::RetriesExhausted {
                            last: error,
                            context,
                        });
                    }
                    return Err(ResourceError::NotRetried {
                        source: error,
                        context,
                    });
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending().await,
    }
}

fn deadline_exceeded(
    context: RequestContext,
    last_error: Option<HttpError>,
    budget: Option<Duration>,
) -> ResourceError {
    ResourceError::RetriesExhausted {
        last: last_error.unwrap_or_else(|| HttpError::Timeout(budget.unwrap_or_default())),
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::governor::GovernorConfig;
    use crate::clients::http_request::HttpMethod;
    use crate::config::{AccessToken, HostUrl, ShopDomain};

    fn config() -> ClientConfig {
        ClientConfig::builder()
            .shop(ShopDomain::new("test-shop").unwrap())
            .access_token(AccessToken::new("token").unwrap())
            .host(HostUrl::new("http://127.0.0.1:9").unwrap())
            .governor(GovernorConfig::default().with_min_interval(Duration::ZERO))
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_client_uses_config_defaults() {
        let client = RestClient::new(&config()).unwrap();
        assert_eq!(client.api_version(), &ApiVersion::latest());
        assert_eq!(client.page_size(), 50);
        assert_eq!(client.retry_policy().max_tries(), 5);
        assert_eq!(client.governor().snapshot().reserved, 0);
    }

    #[test]
    fn test_clients_can_share_a_governor() {
        let config = config();
        let governor = Arc::new(RateLimitGovernor::new(GovernorConfig::default()));
        let a = RestClient::with_governor(&config, Arc::clone(&governor)).unwrap();
        let b = RestClient::with_governor(&config, Arc::clone(&governor)).unwrap();
        assert!(Arc::ptr_eq(a.governor(), b.governor()));

        let c = RestClient::new(&config).unwrap();
        assert!(!Arc::ptr_eq(a.governor(), c.governor()));
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_without_an_exchange() {
        let client = RestClient::new(&config()).unwrap();
        let request = HttpRequest {
            tries: Some(0),
            ..HttpRequest::builder(HttpMethod::Get, "products").build().unwrap()
        };

        let error = client
            .execute(
                request,
                &ResourceContext::new("Product"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, ResourceError::InvalidRequest { .. }));
        assert_eq!(error.attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_dispatch() {
        let client = RestClient::new(&config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = HttpRequest::builder(HttpMethod::Get, "products").build().unwrap();
        let error = client
            .execute(request, &ResourceContext::new("Product"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(error, ResourceError::Cancelled { .. }));
        assert_eq!(error.attempts(), 0);
        assert_eq!(client.governor().snapshot().reserved, 0);
    }
}
