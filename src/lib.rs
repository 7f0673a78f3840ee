//! # Shopify Catalog Client
//!
//! The resource-fetching core of a Shopify Admin REST client: it turns a
//! logical "get product" or "list products" request into paginated,
//! rate-limit-respecting, retry-safe HTTP exchanges and decodes the JSON
//! responses into typed records.
//!
//! ## Overview
//!
//! - Validated configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - A per-shop [`RateLimitGovernor`](clients::RateLimitGovernor) fed by the
//!   `X-Shopify-Shop-Api-Call-Limit` header
//! - A [`RetryPolicy`](clients::RetryPolicy) with jittered exponential
//!   backoff that never repeats an unsafe mutation
//! - Cursor pagination through [`PageWalker`](rest::PageWalker)
//! - A codec that keeps absent and `null` fields apart and preserves fields
//!   it does not know
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use shopify_catalog::{AccessToken, ApiVersion, ClientConfig, RestClient, ShopDomain};
//! use shopify_catalog::clients::RetryPolicy;
//!
//! let config = ClientConfig::builder()
//!     .shop(ShopDomain::new("my-store").unwrap())
//!     .access_token(AccessToken::new("shpat_0123456789").unwrap())
//!     .api_version(ApiVersion::V2025_10)
//!     .retry_policy(RetryPolicy::default().with_max_tries(3))
//!     .exchange_timeout(Duration::from_secs(10))
//!     .build()
//!     .unwrap();
//!
//! let client = RestClient::new(&config).unwrap();
//! assert_eq!(client.retry_policy().max_tries(), 3);
//! ```
//!
//! ## Fetching Records
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use shopify_catalog::clients::CancellationToken;
//! use shopify_catalog::rest::Resource;
//! use shopify_catalog::rest::resources::Product;
//!
//! let cancel = CancellationToken::new();
//!
//! let product = Product::fetch_one(&client, 632910392, None, &cancel).await?;
//! println!("{:?}", product.title);
//!
//! let all: Vec<Product> = Product::fetch_all(&client, None, &cancel)?
//!     .items()
//!     .try_collect()
//!     .await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: clients of the same shop share a governor
//!   explicitly through `Arc`
//! - **Fail-fast validation**: newtypes and requests validate on construction
//! - **Thread-safe**: all public types are `Send + Sync`
//! - **Async-first**: built on the Tokio runtime; waits never block a thread

pub mod clients;
pub mod config;
pub mod error;
pub mod rest;

pub use config::{AccessToken, ApiVersion, ClientConfig, ClientConfigBuilder, HostUrl, ShopDomain};
pub use error::ConfigError;

pub use clients::{
    CancellationToken, HttpError, HttpMethod, HttpRequest, HttpResponse, RestClient,
};
pub use rest::{Field, Resource, ResourceError};
