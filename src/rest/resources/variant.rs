//! Product variants.
//!
//! Variants are listed and created under their product
//! (`products/{product_id}/variants`) and can be fetched or updated either
//! nested or standalone (`variants/{id}`). Path resolution prefers the nested
//! form whenever the record knows its `product_id`.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_catalog::clients::CancellationToken;
//! use shopify_catalog::rest::Resource;
//! use shopify_catalog::rest::resources::{Variant, VariantListParams};
//!
//! let cancel = CancellationToken::new();
//! let params = VariantListParams { limit: Some(100), ..Default::default() };
//! let mut walker = Variant::fetch_all_with_parent(&client, "product_id", 632910392, Some(params), &cancel)?;
//! while let Some(page) = walker.next_page().await? {
//!     for variant in page.iter() {
//!         println!("{:?} {:?}", variant.sku, variant.price);
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::HttpMethod;
use crate::rest::{Field, Resource, ResourceOperation, ResourcePath};

/// Unit of a variant's `weight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeightUnit {
    Kg,
    G,
    Lb,
    Oz,
    /// A unit this crate does not know, kept verbatim.
    Unknown(String),
}

impl From<String> for WeightUnit {
    fn from(value: String) -> Self {
        match value.as_str() {
            "kg" => Self::Kg,
            "g" => Self::G,
            "lb" => Self::Lb,
            "oz" => Self::Oz,
            _ => Self::Unknown(value),
        }
    }
}

impl From<WeightUnit> for String {
    fn from(unit: WeightUnit) -> Self {
        match unit {
            WeightUnit::Kg => "kg".to_string(),
            WeightUnit::G => "g".to_string(),
            WeightUnit::Lb => "lb".to_string(),
            WeightUnit::Oz => "oz".to_string(),
            WeightUnit::Unknown(value) => value,
        }
    }
}

/// One purchasable version of a product.
///
/// Also the shape of the entries of [`Product::variants`](super::Product).
/// Prices are decimal strings as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<u64>,

    /// Owning product; selects the nested paths when set.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub product_id: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub title: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub price: Field<String>,

    /// Original price shown struck through next to `price`.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub compare_at_price: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub sku: Field<String>,

    /// Barcode, UPC or ISBN.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub barcode: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub position: Field<i64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub grams: Field<i64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub weight: Field<f64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub weight_unit: Field<WeightUnit>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub inventory_item_id: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub inventory_quantity: Field<i64>,

    /// `"deny"` or `"continue"` selling when out of stock.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub inventory_policy: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub inventory_management: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub fulfillment_service: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub option1: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub option2: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub option3: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub image_id: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub taxable: Field<bool>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub requires_shipping: Field<bool>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub admin_graphql_api_id: Field<String>,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Variant {
    type Id = u64;
    type FindParams = VariantFindParams;
    type AllParams = VariantListParams;
    type CountParams = ();

    const NAME: &'static str = "Variant";
    const PLURAL: &'static str = "variants";

    const PATHS: &'static [ResourcePath] = &[
        ResourcePath::new(
            HttpMethod::Get,
            ResourceOperation::Find,
            &["product_id", "id"],
            "products/{product_id}/variants/{id}",
        ),
        ResourcePath::new(
            HttpMethod::Get,
            ResourceOperation::Find,
            &["id"],
            "variants/{id}",
        ),
        ResourcePath::new(
            HttpMethod::Get,
            ResourceOperation::All,
            &["product_id"],
            "products/{product_id}/variants",
        ),
        ResourcePath::new(
            HttpMethod::Post,
            ResourceOperation::Create,
            &["product_id"],
            "products/{product_id}/variants",
        ),
        ResourcePath::new(
            HttpMethod::Put,
            ResourceOperation::Update,
            &["product_id", "id"],
            "products/{product_id}/variants/{id}",
        ),
        ResourcePath::new(
            HttpMethod::Put,
            ResourceOperation::Update,
            &["id"],
            "variants/{id}",
        ),
        ResourcePath::new(
            HttpMethod::Delete,
            ResourceOperation::Delete,
            &["product_id", "id"],
            "products/{product_id}/variants/{id}",
        ),
    ];

    fn get_id(&self) -> Option<Self::Id> {
        self.id.value().copied()
    }

    fn path_ids(&self) -> Vec<(&'static str, String)> {
        let mut ids = Vec::with_capacity(2);
        if let Some(id) = self.id.value() {
            ids.push(("id", id.to_string()));
        }
        if let Some(product_id) = self.product_id.value() {
            ids.push(("product_id", product_id.to_string()));
        }
        ids
    }
}

/// Query parameters for fetching one variant.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct VariantFindParams {
    /// Comma-separated fields to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}

/// Filters for listing a product's variants.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct VariantListParams {
    /// Page size, up to 250.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_id: Option<u64>,

    /// Comma-separated fields to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}
