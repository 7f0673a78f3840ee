//! Path tables for REST resources.
//!
//! A resource declares every URL it can be reached through as a
//! [`ResourcePath`]. At request time the façade collects the ids it knows
//! about (the record's own id, a parent id) and [`resolve_path`] picks the
//! most specific template those ids can fill.
//!
//! # Example
//!
//! ```rust
//! use shopify_catalog::clients::HttpMethod;
//! use shopify_catalog::rest::{resolve_path, ResourceOperation, ResourcePath};
//!
//! const PATHS: &[ResourcePath] = &[
//!     ResourcePath::new(
//!         HttpMethod::Get,
//!         ResourceOperation::Find,
//!         &["product_id", "id"],
//!         "products/{product_id}/variants/{id}",
//!     ),
//!     ResourcePath::new(HttpMethod::Get, ResourceOperation::Find, &["id"], "variants/{id}"),
//! ];
//!
//! let nested = resolve_path(
//!     PATHS,
//!     ResourceOperation::Find,
//!     &[("product_id", "12".to_string()), ("id", "34".to_string())],
//! )
//! .unwrap();
//! assert_eq!(nested.path, "products/12/variants/34");
//!
//! let flat = resolve_path(PATHS, ResourceOperation::Find, &[("id", "34".to_string())]).unwrap();
//! assert_eq!(flat.path, "variants/34");
//! ```

use crate::clients::HttpMethod;

/// Id values available for filling a path template, by placeholder name.
pub type PathIds = [(&'static str, String)];

/// Operations a resource can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOperation {
    /// `GET {plural}/{id}`
    Find,
    /// `GET {plural}`
    All,
    /// `POST {plural}`
    Create,
    /// `PUT {plural}/{id}`
    Update,
    /// `DELETE {plural}/{id}`
    Delete,
    /// `GET {plural}/count`
    Count,
}

impl ResourceOperation {
    /// Returns the verb normally used for this operation.
    #[must_use]
    pub const fn default_http_method(&self) -> HttpMethod {
        match self {
            Self::Find | Self::All | Self::Count => HttpMethod::Get,
            Self::Create => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
            Self::Delete => HttpMethod::Delete,
        }
    }

    /// Returns the operation name used in diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::All => "all",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Count => "count",
        }
    }
}

/// One entry of a resource's path table.
///
/// `template` uses `{name}` placeholders, one for each entry of `ids`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePath {
    /// Verb used with this template.
    pub http_method: HttpMethod,
    /// Operation the template serves.
    pub operation: ResourceOperation,
    /// Placeholder names the template needs, outermost first.
    pub ids: &'static [&'static str],
    /// Template relative to `/admin/api/{version}/`, without `.json`.
    pub template: &'static str,
}

impl ResourcePath {
    /// Creates a path table entry. Usable in `const` tables.
    #[must_use]
    pub const fn new(
        http_method: HttpMethod,
        operation: ResourceOperation,
        ids: &'static [&'static str],
        template: &'static str,
    ) -> Self {
        Self {
            http_method,
            operation,
            ids,
            template,
        }
    }

    /// Returns `true` if every placeholder of this template is available.
    #[must_use]
    pub fn matches_ids(&self, available_ids: &[&str]) -> bool {
        self.ids.iter().all(|id| available_ids.contains(id))
    }
}

/// A template filled with concrete ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Verb to send.
    pub http_method: HttpMethod,
    /// Concrete path relative to `/admin/api/{version}/`.
    pub path: String,
}

/// Picks the most specific template for `operation` whose placeholders are
/// all in `available_ids`.
#[must_use]
pub fn get_path<'a>(
    paths: &'a [ResourcePath],
    operation: ResourceOperation,
    available_ids: &[&str],
) -> Option<&'a ResourcePath> {
    paths
        .iter()
        .filter(|p| p.operation == operation && p.matches_ids(available_ids))
        .max_by_key(|p| p.ids.len())
}

/// Fills `{name}` placeholders in `template`.
///
/// Values are percent-encoded so that an id can never add path segments.
/// Placeholders without a value are left in place.
#[must_use]
pub fn build_path(template: &str, ids: &PathIds) -> String {
    ids.iter().fold(template.to_string(), |path, (name, value)| {
        path.replace(&format!("{{{name}}}"), &urlencoding::encode(value))
    })
}

/// Selects and fills the best template for `operation`.
///
/// Returns `None` when no template of the table can be filled with `ids`.
#[must_use]
pub fn resolve_path(
    paths: &[ResourcePath],
    operation: ResourceOperation,
    ids: &PathIds,
) -> Option<ResolvedPath> {
    let available: Vec<&str> = ids.iter().map(|(name, _)| *name).collect();
    let selected = get_path(paths, operation, &available)?;

    Some(ResolvedPath {
        http_method: selected.http_method,
        path: build_path(selected.template, ids),
    })
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceOperation>();
    assert_send_sync::<ResourcePath>();
    assert_send_sync::<ResolvedPath>();
};
