//! Records embedded in products: options, images and metafields.
//!
//! These travel inside a product document and are not addressed on their
//! own by this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rest::Field;

/// A product option such as "Size" or "Color".
///
/// A product has at most three options; each variant picks one value per
/// option through `option1`..`option3`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub product_id: Field<u64>,

    /// Option name, at most 255 characters.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub name: Field<String>,

    /// 1-based position among the product's options.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub position: Field<i64>,

    /// The values variants may take for this option.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub values: Field<Vec<String>>,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An image attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub product_id: Field<u64>,

    /// 1-based position; position 1 is the featured image.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub position: Field<i64>,

    /// CDN URL of the image.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub src: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub width: Field<i64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub height: Field<i64>,

    /// Alternative text.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub alt: Field<String>,

    /// Variants displaying this image.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub variant_ids: Field<Vec<u64>>,

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

/// A namespaced key/value pair attached to a resource.
///
/// `value` is kept as raw JSON: its shape depends on `type`, which the
/// server may extend at any time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metafield {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<u64>,

    /// Groups metafields of one app or purpose.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub namespace: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub key: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub value: Field<Value>,

    /// Content type, e.g. `single_line_text_field` or `number_integer`.
    #[serde(default, rename = "type", skip_serializing_if = "Field::is_absent")]
    pub value_type: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub description: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub owner_id: Field<u64>,

    /// Kind of owning resource, e.g. `product`.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub owner_resource: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub created_at: Field<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub updated_at: Field<DateTime<Utc>>,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_decodes_and_keeps_unknown_fields() {
        let option: ProductOption = serde_json::from_value(json!({
            "id": 594680422,
            "product_id": 632910392,
            "name": "Size",
            "position": 1,
            "values": ["Small", "Medium", "Large"],
            "swatch": {"kind": "text"}
        }))
        .unwrap();

        assert_eq!(option.name, Field::Value("Size".to_string()));
        assert_eq!(
            option.values.value().map(Vec::len),
            Some(3)
        );
        assert_eq!(option.extra["swatch"], json!({"kind": "text"}));

        let encoded = serde_json::to_value(&option).unwrap();
        assert_eq!(encoded["swatch"]["kind"], "text");
    }

    #[test]
    fn test_image_null_alt_survives_round_trip() {
        let document = json!({
            "id": 850703190,
            "position": 1,
            "src": "https://cdn.shopify.com/s/files/1/0006/9093/3842/products/ipod-nano.png",
            "alt": null,
            "variant_ids": [],
            "created_at": "2024-01-15T10:30:00Z"
        });

        let image: ProductImage = serde_json::from_value(document.clone()).unwrap();
        assert!(image.alt.is_null());
        assert!(image.width.is_absent());
        assert!(image.created_at.is_value());

        assert_eq!(serde_json::to_value(&image).unwrap(), document);
    }

    #[test]
    fn test_metafield_value_is_raw_json() {
        let metafield: Metafield = serde_json::from_value(json!({
            "namespace": "specs",
            "key": "dimensions",
            "type": "json",
            "value": {"w": 10, "h": 4}
        }))
        .unwrap();

        assert_eq!(metafield.value_type, Field::Value("json".to_string()));
        assert_eq!(metafield.value.value(), Some(&json!({"w": 10, "h": 4})));

        let encoded = serde_json::to_value(&metafield).unwrap();
        assert_eq!(encoded["type"], "json");
        assert!(encoded.get("value_type").is_none());
    }
}
