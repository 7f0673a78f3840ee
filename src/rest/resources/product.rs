//! The product record.
//!
//! A product carries its variants, options, images and (when requested)
//! metafields inline. Every field is a [`Field`], so a document fetched with
//! `fields=id,title` decodes with the remaining fields [`Field::Absent`] and
//! re-encodes without them.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use shopify_catalog::clients::CancellationToken;
//! use shopify_catalog::rest::{Field, Resource};
//! use shopify_catalog::rest::resources::{Product, ProductListParams, ProductStatus};
//!
//! let cancel = CancellationToken::new();
//!
//! let params = ProductListParams {
//!     status: Some(ProductStatus::Active),
//!     vendor: Some("Burton".to_string()),
//!     ..Default::default()
//! };
//! let boards: Vec<Product> = Product::fetch_all(&client, Some(params), &cancel)?
//!     .items()
//!     .try_collect()
//!     .await?;
//!
//! let draft = Product {
//!     title: Field::Value("Burton Custom Freestyle 151".to_string()),
//!     status: Field::Value(ProductStatus::Draft),
//!     ..Default::default()
//! };
//! let created = draft.create(&client, Some("board-151"), &cancel).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::HttpMethod;
use crate::rest::{Field, Resource, ResourceOperation, ResourcePath};

use super::common::{Metafield, ProductImage, ProductOption};
use super::variant::Variant;

/// Publication state of a product.
///
/// Values this crate does not know decode to [`Unknown`](Self::Unknown)
/// and are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductStatus {
    /// Ready to sell on the channels it is published to.
    Active,
    /// No longer sold; hidden from channels.
    Archived,
    /// Not ready to sell.
    Draft,
    /// A status added by the server after this crate was written.
    Unknown(String),
}

impl ProductStatus {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Draft => "draft",
            Self::Unknown(value) => value,
        }
    }
}

impl From<String> for ProductStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "archived" => Self::Archived,
            "draft" => Self::Draft,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ProductStatus> for String {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Unknown(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

/// A product in the shop's catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub title: Field<String>,

    /// Description, with HTML markup.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub body_html: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub vendor: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub product_type: Field<String>,

    /// URL slug, generated from the title unless set.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub handle: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub status: Field<ProductStatus>,

    /// Comma-separated tags, each at most 255 characters.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub tags: Field<String>,

    /// Suffix of the theme template, e.g. `"special"` for
    /// `product.special.liquid`.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub template_suffix: Field<String>,

    /// `"web"` or `"global"`.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub published_scope: Field<String>,

    /// Write-only on most API versions: `false` unpublishes the product.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub published: Field<bool>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<DateTime<Utc>>,

    /// `null` while the product is unpublished.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub published_at: Field<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub admin_graphql_api_id: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub variants: Field<Vec<Variant>>,

    /// At most three options.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub options: Field<Vec<ProductOption>>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub images: Field<Vec<ProductImage>>,

    /// The featured image.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub image: Field<ProductImage>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub metafields: Field<Vec<Metafield>>,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Product {
    type Id = u64;
    type FindParams = ProductFindParams;
    type AllParams = ProductListParams;
    type CountParams = ProductCountParams;

    const NAME: &'static str = "Product";
    const PLURAL: &'static str = "products";

    const PATHS: &'static [ResourcePath] = &[
        ResourcePath::new(
            HttpMethod::Get,
            ResourceOperation::Find,
            &["id"],
            "products/{id}",
        ),
        ResourcePath::new(HttpMethod::Get, ResourceOperation::All, &[], "products"),
        ResourcePath::new(
            HttpMethod::Get,
            ResourceOperation::Count,
            &[],
            "products/count",
        ),
        ResourcePath::new(HttpMethod::Post, ResourceOperation::Create, &[], "products"),
        ResourcePath::new(
            HttpMethod::Put,
            ResourceOperation::Update,
            &["id"],
            "products/{id}",
        ),
        ResourcePath::new(
            HttpMethod::Delete,
            ResourceOperation::Delete,
            &["id"],
            "products/{id}",
        ),
    ];

    fn get_id(&self) -> Option<Self::Id> {
        self.id.value().copied()
    }
}

/// Query parameters for fetching one product.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ProductFindParams {
    /// Comma-separated fields to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}

/// Filters for listing products.
///
/// Only `limit` and `fields` are carried to pages after the first; the
/// cursor already encodes the other filters.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ProductListParams {
    /// Sent as a comma-separated list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<u64>>,

    /// Page size, up to 250. Defaults to the client's page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_min: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_max: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_min: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_max: Option<DateTime<Utc>>,

    /// `"published"`, `"unpublished"` or `"any"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_status: Option<String>,

    /// Comma-separated fields to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}

/// Filters for counting products.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ProductCountParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_min: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at_min: Option<DateTime<Utc>>,

    /// `"published"`, `"unpublished"` or `"any"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_status: Option<String>,
}
