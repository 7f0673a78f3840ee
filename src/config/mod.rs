//! Configuration types for the catalog client.
//!
//! # Overview
//!
//! - [`ClientConfig`]: everything a [`RestClient`](crate::clients::RestClient) needs
//! - [`ClientConfigBuilder`]: fail-fast builder for [`ClientConfig`]
//! - [`AccessToken`], [`ShopDomain`], [`HostUrl`]: validated newtypes
//! - [`ApiVersion`]: the Admin API version to address
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use shopify_catalog::{AccessToken, ApiVersion, ClientConfig, ShopDomain};
//!
//! let config = ClientConfig::builder()
//!     .shop(ShopDomain::new("my-store").unwrap())
//!     .access_token(AccessToken::new("shpat_123").unwrap())
//!     .api_version(ApiVersion::V2025_07)
//!     .exchange_timeout(Duration::from_secs(10))
//!     .page_size(250)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.page_size(), 250);
//! ```

mod newtypes;
mod version;

use std::time::Duration;

pub use newtypes::{AccessToken, HostUrl, ShopDomain};
pub use version::ApiVersion;

use crate::clients::{GovernorConfig, RetryPolicy};
use crate::error::ConfigError;

/// Default per-exchange timeout.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size the Admin REST API accepts.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Configuration for a [`RestClient`](crate::clients::RestClient).
///
/// One configuration addresses exactly one shop. Clients for different shops
/// never share rate-limit state.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    shop: ShopDomain,
    access_token: AccessToken,
    api_version: ApiVersion,
    host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    exchange_timeout: Duration,
    page_size: u32,
    retry_policy: RetryPolicy,
    governor: GovernorConfig,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the shop this configuration addresses.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// Returns the access token.
    #[must_use]
    pub const fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Returns the API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the host override, if configured.
    #[must_use]
    pub const fn host(&self) -> Option<&HostUrl> {
        self.host.as_ref()
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the default deadline applied to each HTTP exchange.
    #[must_use]
    pub const fn exchange_timeout(&self) -> Duration {
        self.exchange_timeout
    }

    /// Returns the default page size for list requests.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the rate-limit governor settings.
    #[must_use]
    pub const fn governor(&self) -> &GovernorConfig {
        &self.governor
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for [`ClientConfig`].
///
/// `shop` and `access_token` are required.
///
/// # Defaults
///
/// - `api_version`: [`ApiVersion::latest`]
/// - `exchange_timeout`: 30 seconds
/// - `page_size`: 50
/// - `retry_policy`: [`RetryPolicy::default`] (5 tries)
/// - `governor`: [`GovernorConfig::default`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    shop: Option<ShopDomain>,
    access_token: Option<AccessToken>,
    api_version: Option<ApiVersion>,
    host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    exchange_timeout: Option<Duration>,
    page_size: Option<u32>,
    retry_policy: Option<RetryPolicy>,
    governor: Option<GovernorConfig>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shop (required).
    #[must_use]
    pub fn shop(mut self, shop: ShopDomain) -> Self {
        self.shop = Some(shop);
        self
    }

    /// Sets the access token (required).
    #[must_use]
    pub fn access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    /// Sets the API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Sends requests to `host` instead of the shop's own domain.
    #[must_use]
    pub fn host(mut self, host: HostUrl) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the default per-exchange timeout.
    #[must_use]
    pub const fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = Some(timeout);
        self
    }

    /// Sets the default page size for list requests (1..=250).
    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the rate-limit governor settings.
    #[must_use]
    pub const fn governor(mut self, governor: GovernorConfig) -> Self {
        self.governor = Some(governor);
        self
    }

    /// Builds the [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `shop` or
    /// `access_token` are not set, and [`ConfigError::InvalidSetting`] for an
    /// out-of-range page size, a zero timeout, or a retry policy allowing zero
    /// tries.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let shop = self
            .shop
            .ok_or(ConfigError::MissingRequiredField { field: "shop" })?;
        let access_token = self
            .access_token
            .ok_or(ConfigError::MissingRequiredField {
                field: "access_token",
            })?;

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::InvalidSetting {
                field: "page_size",
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
            });
        }

        let exchange_timeout = self.exchange_timeout.unwrap_or(DEFAULT_EXCHANGE_TIMEOUT);
        if exchange_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                field: "exchange_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        let retry_policy = self.retry_policy.unwrap_or_default();
        if retry_policy.max_tries() == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "retry_policy",
                reason: "max_tries must be at least 1".to_string(),
            });
        }

        Ok(ClientConfig {
            shop,
            access_token,
            api_version: self.api_version.unwrap_or_else(ApiVersion::latest),
            host: self.host,
            user_agent_prefix: self.user_agent_prefix,
            exchange_timeout,
            page_size,
            retry_policy,
            governor: self.governor.unwrap_or_default(),
        })
    }
}
