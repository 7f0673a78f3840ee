//! Single HTTP exchanges against the Admin REST API.
//!
//! [`HttpClient`] performs exactly one exchange per call. Throttling and
//! retries are layered on top by [`RestClient`](crate::clients::RestClient).

use std::collections::HashMap;
use std::time::Duration;

use crate::clients::errors::{HttpError, HttpResponseError};
use crate::clients::http_request::{HttpMethod, HttpRequest, IDEMPOTENCY_KEY_HEADER};
use crate::clients::http_response::HttpResponse;
use crate::config::ClientConfig;
use crate::error::ConfigError;

/// Crate version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP transport for one shop.
///
/// The client handles:
/// - Base URI construction from the shop domain or a host override
/// - Default headers including User-Agent and the access token
/// - Per-exchange timeouts
/// - Classification of the response status into [`HttpError`]
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync` and is shared by all requests of a
/// [`RestClient`](crate::clients::RestClient).
///
/// # Example
///
/// ```rust
/// use shopify_catalog::{AccessToken, ApiVersion, ClientConfig, ShopDomain};
/// use shopify_catalog::clients::HttpClient;
///
/// let config = ClientConfig::builder()
///     .shop(ShopDomain::new("my-store").unwrap())
///     .access_token(AccessToken::new("shpat_123").unwrap())
///     .api_version(ApiVersion::V2025_10)
///     .build()
///     .unwrap();
///
/// let client = HttpClient::new(&config).unwrap();
/// assert_eq!(client.base_uri(), "https://my-store.myshopify.com");
/// assert_eq!(client.base_path(), "/admin/api/2025-10");
/// ```
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_uri: String,
    base_path: String,
    default_headers: HashMap<String, String>,
    default_timeout: Duration,
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a transport for the shop named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientInit`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let shop = config.shop().as_ref();
        let base_uri = config
            .host()
            .map_or_else(|| format!("https://{shop}"), |host| host.origin().to_string());
        let base_path = format!("/admin/api/{}", config.api_version());

        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Shopify Catalog Client v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        default_headers.insert(
            "X-Shopify-Access-Token".to_string(),
            config.access_token().as_ref().to_string(),
        );
        // Requests routed through a host override still address the shop.
        if config.host().is_some() {
            default_headers.insert("Host".to_string(), shop.to_string());
        }

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| ConfigError::HttpClientInit {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_uri,
            base_path,
            default_headers,
            default_timeout: config.exchange_timeout(),
        })
    }

    /// Returns the base URI for this client.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the versioned base path, e.g. `/admin/api/2025-10`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the default per-exchange timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Returns the full URL for a request.
    #[must_use]
    pub fn url_for(&self, request: &HttpRequest) -> String {
        format!(
            "{}{}/{}.json",
            self.base_uri,
            self.base_path,
            request.normalized_path()
        )
    }

    /// Performs one exchange and returns the response whatever its status.
    ///
    /// `timeout` bounds the whole exchange, body included.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidRequest`] if the request fails
    /// validation, [`HttpError::Timeout`] if the exchange exceeds `timeout`,
    /// and [`HttpError::Transport`] for any other network failure.
    pub async fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = self.url_for(request);
        let mut builder = match request.http_method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in &self.default_headers {
            builder = builder.header(key, value);
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                builder = builder.header(key, value);
            }
        }
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        if let Some(query) = &request.query {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body.to_string());
        }

        tracing::debug!(
            method = %request.http_method,
            path = %request.normalized_path(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "Sending request to Shopify API"
        );

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                HttpError::Timeout(timeout)
            } else {
                HttpError::Transport(e)
            }
        };

        let res = builder.timeout(timeout).send().await.map_err(classify)?;
        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let body = res.text().await.map_err(classify)?;

        let response = HttpResponse::new(code, headers, body);

        if let Some(reason) = response.deprecation_reason() {
            tracing::warn!(
                "Deprecated request to Shopify API at {}, received reason: {}",
                request.normalized_path(),
                reason
            );
        }

        Ok(response)
    }

    /// Maps a non-2xx response onto the matching [`HttpError`].
    ///
    /// # Errors
    ///
    /// - 429 becomes [`HttpError::RateLimited`]
    /// - 5xx becomes [`HttpError::Server`]
    /// - any other non-2xx becomes [`HttpError::Response`]
    pub fn check_status(response: HttpResponse) -> Result<HttpResponse, HttpError> {
        if response.is_ok() {
            return Ok(response);
        }

        let error = HttpResponseError::from_response(&response);
        Err(match response.code {
            429 => HttpError::RateLimited {
                retry_after: response.retry_after,
                error,
            },
            500..=599 => HttpError::Server(error),
            _ => HttpError::Response(error),
        })
    }

    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}
