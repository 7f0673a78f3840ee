//! Wire JSON to typed records and back.
//!
//! Records are plain serde structs implementing [`Resource`]. Two
//! conventions make them forward compatible with the live API:
//!
//! - every optional field is a [`Field<T>`], which keeps "not sent" apart
//!   from "sent as `null`"
//! - a `#[serde(flatten)] extra` map catches fields the struct does not
//!   declare, and writes them back out on encode
//!
//! Admin REST responses wrap records in an envelope: `{"product": {...}}`
//! for one record, `{"products": [...]}` for a list and `{"count": n}` for
//! counts. The `decode_*` helpers unwrap those envelopes.
//!
//! # Example
//!
//! ```rust
//! use shopify_catalog::rest::codec::{self, Field};
//! use shopify_catalog::rest::resources::Product;
//!
//! let body = br#"{"product": {"id": 1, "title": "Board", "published_at": null, "new_field": 7}}"#;
//! let product: Product = codec::decode_one(body).unwrap();
//!
//! assert_eq!(product.title, Field::Value("Board".to_string()));
//! assert_eq!(product.published_at, Field::Null);
//! assert_eq!(product.vendor, Field::Absent);
//! assert_eq!(product.extra["new_field"], 7);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::rest::Resource;

/// A field that may be absent, explicitly null, or set.
///
/// Declare record fields as
/// `#[serde(default, skip_serializing_if = "Field::is_absent")]` so that an
/// absent field is left out of encoded documents while a null one is
/// written as `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Field<T> {
    /// The field was not present in the document.
    #[default]
    Absent,
    /// The field was present with the value `null`.
    Null,
    /// The field was present with a value.
    Value(T),
}

impl<T> Field<T> {
    /// Returns `true` if the field was not present.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if the field was explicitly `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the field holds a value.
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns the value, if set.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Null => None,
        }
    }

    /// Converts into an `Option`, losing the absent/null distinction.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Null => None,
        }
    }

    /// Maps the value, keeping absent and null as they are.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Self::Absent => Field::Absent,
            Self::Null => Field::Null,
            Self::Value(value) => Field::Value(f(value)),
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(value) => serializer.serialize_some(value),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the key is present; `#[serde(default)]` covers absence.
        Option::<T>::deserialize(deserializer).map(|value| value.map_or(Self::Null, Self::Value))
    }
}

/// Errors raised while converting between JSON documents and records.
///
/// These are never retried: the same bytes decode the same way every time.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The payload is not valid structured data for the declared shape.
    #[error("Malformed {resource} payload: {reason}")]
    Malformed {
        /// The resource being decoded.
        resource: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The record could not be written as JSON.
    #[error("Failed to encode {resource}: {reason}")]
    Unencodable {
        /// The resource being encoded.
        resource: &'static str,
        /// The serializer's error.
        reason: String,
    },
}

impl CodecError {
    fn malformed<R: Resource>(reason: impl ToString) -> Self {
        Self::Malformed {
            resource: R::NAME,
            reason: reason.to_string(),
        }
    }
}

/// Decodes a bare record document.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the bytes are not a JSON object of
/// the record's shape.
pub fn decode<R: Resource>(bytes: &[u8]) -> Result<R, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::malformed::<R>)
}

/// Encodes a record as a bare JSON document.
///
/// # Errors
///
/// Returns [`CodecError::Unencodable`] if serialization fails.
pub fn encode<R: Resource>(record: &R) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(record).map_err(|e| CodecError::Unencodable {
        resource: R::NAME,
        reason: e.to_string(),
    })
}

/// Decodes `{"<key>": {...}}`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the envelope or the record is
/// malformed.
pub fn decode_one<R: Resource>(bytes: &[u8]) -> Result<R, CodecError> {
    let key = R::resource_key();
    let record = take_envelope::<R>(bytes, &key)?;
    serde_json::from_value(record).map_err(CodecError::malformed::<R>)
}

/// Decodes `{"<plural>": [...]}`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the envelope is not an array of
/// records of the right shape.
pub fn decode_many<R: Resource>(bytes: &[u8]) -> Result<Vec<R>, CodecError> {
    let records = take_envelope::<R>(bytes, R::PLURAL)?;
    if !records.is_array() {
        return Err(CodecError::malformed::<R>(format!(
            "expected an array under `{}`",
            R::PLURAL
        )));
    }
    serde_json::from_value(records).map_err(CodecError::malformed::<R>)
}

/// Decodes `{"count": n}`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if `count` is missing or not a
/// non-negative integer.
pub fn decode_count<R: Resource>(bytes: &[u8]) -> Result<u64, CodecError> {
    take_envelope::<R>(bytes, "count")?
        .as_u64()
        .ok_or_else(|| CodecError::malformed::<R>("`count` is not a non-negative integer"))
}

/// Wraps a record as `{"<key>": {...}}` for a request body.
///
/// # Errors
///
/// Returns [`CodecError::Unencodable`] if serialization fails.
pub fn encode_envelope<R: Resource>(record: &R) -> Result<Value, CodecError> {
    let value = serde_json::to_value(record).map_err(|e| CodecError::Unencodable {
        resource: R::NAME,
        reason: e.to_string(),
    })?;
    let mut envelope = serde_json::Map::new();
    envelope.insert(R::resource_key(), value);
    Ok(Value::Object(envelope))
}

fn take_envelope<R: Resource>(bytes: &[u8], key: &str) -> Result<Value, CodecError> {
    let document: Value = serde_json::from_slice(bytes).map_err(CodecError::malformed::<R>)?;
    match document {
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| CodecError::malformed::<R>(format!("missing `{key}` key"))),
        other => Err(CodecError::malformed::<R>(format!(
            "expected a JSON object, found {}",
            json_type(&other)
        ))),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpMethod;
    use crate::rest::{ResourceOperation, ResourcePath};
    use serde_json::json;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Widget {
        #[serde(default, skip_serializing_if = "Field::is_absent")]
        id: Field<u64>,
        #[serde(default, skip_serializing_if = "Field::is_absent")]
        name: Field<String>,
        #[serde(default, skip_serializing_if = "Field::is_absent")]
        tags: Field<Vec<String>>,
        #[serde(flatten)]
        extra: serde_json::Map<String, Value>,
    }

    impl Resource for Widget {
        type Id = u64;
        type FindParams = ();
        type AllParams = ();
        type CountParams = ();

        const NAME: &'static str = "Widget";
        const PLURAL: &'static str = "widgets";
        const PATHS: &'static [ResourcePath] = &[ResourcePath::new(
            HttpMethod::Get,
            ResourceOperation::All,
            &[],
            "widgets",
        )];

        fn get_id(&self) -> Option<Self::Id> {
            self.id.value().copied()
        }
    }

    #[test]
    fn test_round_trip_without_unknown_fields() {
        let widget = Widget {
            id: Field::Value(7),
            name: Field::Null,
            tags: Field::Value(vec!["a".to_string()]),
            ..Widget::default()
        };

        let decoded: Widget = decode(&encode(&widget).unwrap()).unwrap();
        assert_eq!(decoded, widget);
    }

    #[test]
    fn test_absent_and_null_are_distinct() {
        let widget: Widget = decode(br#"{"id": 1, "name": null}"#).unwrap();
        assert_eq!(widget.name, Field::Null);
        assert_eq!(widget.tags, Field::Absent);

        let encoded: Value = serde_json::from_slice(&encode(&widget).unwrap()).unwrap();
        assert_eq!(encoded, json!({"id": 1, "name": null}));
    }

    #[test]
    fn test_unknown_fields_are_kept_and_re_emitted() {
        let widget: Widget =
            decode(br#"{"id": 1, "colour": "red", "dims": {"w": 2}}"#).unwrap();
        assert_eq!(widget.extra["colour"], "red");
        assert_eq!(widget.extra["dims"], json!({"w": 2}));

        let encoded: Value = serde_json::from_slice(&encode(&widget).unwrap()).unwrap();
        assert_eq!(encoded["colour"], "red");
        assert_eq!(encoded["dims"]["w"], 2);
    }

    #[test]
    fn test_envelopes() {
        let one: Widget = decode_one(br#"{"widget": {"id": 3}}"#).unwrap();
        assert_eq!(one.get_id(), Some(3));

        let many: Vec<Widget> = decode_many(br#"{"widgets": [{"id": 1}, {"id": 2}]}"#).unwrap();
        assert_eq!(many.len(), 2);

        let empty: Vec<Widget> = decode_many(br#"{"widgets": []}"#).unwrap();
        assert!(empty.is_empty());

        assert_eq!(decode_count::<Widget>(br#"{"count": 12}"#).unwrap(), 12);

        let body = encode_envelope(&one).unwrap();
        assert_eq!(body, json!({"widget": {"id": 3}}));
    }

    #[test]
    fn test_malformed_payloads() {
        let cases: &[&[u8]] = &[
            b"not json",
            b"[1, 2]",
            br#"{"widget": 5}"#,
            br#"{"thing": {}}"#,
            br#"{"widget": {"id": "seven"}}"#,
        ];
        for bytes in cases {
            let error = decode_one::<Widget>(bytes).unwrap_err();
            assert!(
                matches!(error, CodecError::Malformed { resource: "Widget", .. }),
                "{error:?}"
            );
        }

        assert!(decode_many::<Widget>(br#"{"widgets": {"id": 1}}"#).is_err());
        assert!(decode_count::<Widget>(br#"{"count": -1}"#).is_err());
        assert!(decode::<Widget>(b"42").is_err());
    }

    #[test]
    fn test_field_helpers() {
        let field: Field<u32> = 5.into();
        assert!(field.is_value());
        assert_eq!(field.value(), Some(&5));
        assert_eq!(field.clone().map(|v| v * 2), Field::Value(10));
        assert_eq!(Field::<u32>::Null.map(|v| v * 2), Field::Null);
        assert_eq!(Field::<u32>::Absent.into_option(), None);
        assert!(Field::<u32>::default().is_absent());
    }
}
