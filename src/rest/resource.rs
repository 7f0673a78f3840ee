//! The [`Resource`] trait: typed records with a REST façade.
//!
//! A resource declares its names, path table and parameter types. The
//! trait's default methods then provide fetch, list, count and mutation
//! operations, each run as one logical request through the
//! [`RestClient`]: governed, retried on transient failures and decoded by
//! the [`codec`].
//!
//! # Implementing a Resource
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use shopify_catalog::clients::HttpMethod;
//! use shopify_catalog::rest::codec::Field;
//! use shopify_catalog::rest::{Resource, ResourceOperation, ResourcePath};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! pub struct Collection {
//!     #[serde(default, skip_serializing_if = "Field::is_absent")]
//!     pub id: Field<u64>,
//!     #[serde(default, skip_serializing_if = "Field::is_absent")]
//!     pub title: Field<String>,
//!     #[serde(flatten)]
//!     pub extra: serde_json::Map<String, serde_json::Value>,
//! }
//!
//! impl Resource for Collection {
//!     type Id = u64;
//!     type FindParams = ();
//!     type AllParams = ();
//!     type CountParams = ();
//!
//!     const NAME: &'static str = "Collection";
//!     const PLURAL: &'static str = "collections";
//!     const PATHS: &'static [ResourcePath] = &[
//!         ResourcePath::new(HttpMethod::Get, ResourceOperation::Find, &["id"], "collections/{id}"),
//!     ];
//!
//!     fn get_id(&self) -> Option<u64> {
//!         self.id.value().copied()
//!     }
//! }
//!
//! assert_eq!(Collection::resource_key(), "collection");
//! ```

use std::collections::HashMap;
use std::fmt::Display;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::clients::{CancellationToken, HttpMethod, HttpRequest, HttpResponse, PageCursor, RestClient};
use crate::rest::codec::{self, CodecError};
use crate::rest::pagination::{continuation_query, fetch_list_page};
use crate::rest::path::{resolve_path, ResolvedPath};
use crate::rest::{
    Page, PageWalker, RequestContext, ResourceContext, ResourceError, ResourceOperation,
    ResourcePath, ResourceResponse,
};

/// A typed Admin REST record.
///
/// # Associated Types
///
/// - `Id`: identifier type, interpolated into paths via `Display`
/// - `FindParams`, `AllParams`, `CountParams`: query parameters, serialized
///   to a flat map (use `()` when there are none)
///
/// # Associated Constants
///
/// - `NAME`: singular name, e.g. `"Product"`; lowercased it is the JSON
///   envelope key
/// - `PLURAL`: list envelope key, e.g. `"products"`
/// - `PATHS`: path table, see [`ResourcePath`]
/// - `PREFIX`: optional path prefix for every template
#[allow(async_fn_in_trait)]
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + Sized {
    /// The record's identifier type.
    type Id: Display + Clone + Send + Sync;

    /// Query parameters for [`fetch_one`](Self::fetch_one).
    type FindParams: Serialize + Default + Send + Sync;

    /// Query parameters for list operations.
    type AllParams: Serialize + Default + Send + Sync;

    /// Query parameters for [`count`](Self::count).
    type CountParams: Serialize + Default + Send + Sync;

    /// Singular name, used in diagnostics and as the envelope key.
    const NAME: &'static str;

    /// Plural name, used as the list envelope key.
    const PLURAL: &'static str;

    /// Every template the resource can be reached through.
    const PATHS: &'static [ResourcePath];

    /// Prefix prepended to every template.
    const PREFIX: Option<&'static str> = None;

    /// Returns the record's id; `None` for records not yet created.
    fn get_id(&self) -> Option<Self::Id>;

    /// Envelope key for single-record bodies: `NAME` in snake case, so
    /// `ProductImage` becomes `product_image`.
    #[must_use]
    fn resource_key() -> String {
        snake_case(Self::NAME)
    }

    /// Ids this record contributes to path resolution.
    ///
    /// Nested resources override this to add their parent id.
    fn path_ids(&self) -> Vec<(&'static str, String)> {
        self.get_id()
            .map(|id| ("id", id.to_string()))
            .into_iter()
            .collect()
    }

    /// Fetches one record by id.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] for an unknown id, and any other
    /// terminal [`ResourceError`] of the request.
    async fn fetch_one(
        client: &RestClient,
        id: Self::Id,
        params: Option<Self::FindParams>,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse<Self>, ResourceError> {
        let ids = [("id", id.to_string())];
        let resolved = resolve::<Self>(ResourceOperation::Find, &ids)?;
        let query = serialize_to_query::<Self, _>(params.as_ref())?;
        let request = build_request::<Self>(resolved.http_method, &resolved.path, query, None, None)?;

        let target = ResourceContext::new(Self::NAME).with_id(&id);
        let (response, context) = client.run(request, &target, cancel).await?;
        let record = decoded(
            codec::decode_one::<Self>(response.body.as_bytes()),
            &response,
            context,
        )?;
        Ok(ResourceResponse::from_parts(record, &response))
    }

    /// Fetches a single page of the top-level list.
    ///
    /// Without a cursor the first page is fetched with `params` as filters.
    /// With a cursor only `limit` and `fields` of `params` are sent along.
    ///
    /// # Errors
    ///
    /// Returns any terminal [`ResourceError`] of the request.
    async fn fetch_page(
        client: &RestClient,
        params: Option<Self::AllParams>,
        cursor: Option<&PageCursor>,
        cancel: &CancellationToken,
    ) -> Result<Page<Self>, ResourceError> {
        let resolved = resolve::<Self>(ResourceOperation::All, &[])?;
        let query = list_query::<Self>(client, params.as_ref())?;
        let query = match cursor {
            Some(cursor) => continuation_query(&query, cursor),
            None => query,
        };
        fetch_list_page::<Self>(client, &resolved.path, query, cancel).await
    }

    /// Returns a walker over every page of the top-level list.
    ///
    /// No request is made until the walker is polled.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PathResolutionFailed`] if the resource
    /// cannot be listed without a parent, and
    /// [`ResourceError::InvalidParams`] if `params` do not serialize.
    fn fetch_all<'c>(
        client: &'c RestClient,
        params: Option<Self::AllParams>,
        cancel: &CancellationToken,
    ) -> Result<PageWalker<'c, Self>, ResourceError> {
        let resolved = resolve::<Self>(ResourceOperation::All, &[])?;
        let query = list_query::<Self>(client, params.as_ref())?;
        Ok(PageWalker::new(client, resolved.path, query, cancel.clone()))
    }

    /// Returns a walker over every page of a list nested under a parent,
    /// e.g. the variants of one product.
    ///
    /// # Errors
    ///
    /// As for [`fetch_all`](Self::fetch_all).
    fn fetch_all_with_parent<'c, P: Display>(
        client: &'c RestClient,
        parent_id_name: &'static str,
        parent_id: P,
        params: Option<Self::AllParams>,
        cancel: &CancellationToken,
    ) -> Result<PageWalker<'c, Self>, ResourceError> {
        let ids = [(parent_id_name, parent_id.to_string())];
        let resolved = resolve::<Self>(ResourceOperation::All, &ids)?;
        let query = list_query::<Self>(client, params.as_ref())?;
        Ok(PageWalker::new(client, resolved.path, query, cancel.clone()))
    }

    /// Counts the records matching `params`.
    ///
    /// # Errors
    ///
    /// Returns any terminal [`ResourceError`] of the request.
    async fn count(
        client: &RestClient,
        params: Option<Self::CountParams>,
        cancel: &CancellationToken,
    ) -> Result<u64, ResourceError> {
        let resolved = resolve::<Self>(ResourceOperation::Count, &[])?;
        let query = serialize_to_query::<Self, _>(params.as_ref())?;
        let request = build_request::<Self>(resolved.http_method, &resolved.path, query, None, None)?;

        let (response, context) = client
            .run(request, &ResourceContext::new(Self::NAME), cancel)
            .await?;
        decoded(
            codec::decode_count::<Self>(response.body.as_bytes()),
            &response,
            context,
        )
    }

    /// Creates this record and returns the server's copy.
    ///
    /// Without an `idempotency_key` a POST that may have reached the server
    /// is never repeated; with one, the full retry policy applies.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::ValidationFailed`] when the server rejects
    /// the payload, and any other terminal [`ResourceError`].
    async fn create(
        &self,
        client: &RestClient,
        idempotency_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse<Self>, ResourceError> {
        let resolved = resolve::<Self>(ResourceOperation::Create, &self.path_ids())?;
        send_record(self, client, resolved, ResourceContext::new(Self::NAME), idempotency_key, cancel)
            .await
    }

    /// Writes this record over the stored one and returns the server's copy.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PathResolutionFailed`] if the record has no
    /// id, and any terminal [`ResourceError`] of the request.
    async fn update(
        &self,
        client: &RestClient,
        idempotency_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse<Self>, ResourceError> {
        let id = self.get_id().ok_or(ResourceError::PathResolutionFailed {
            resource: Self::NAME,
            operation: ResourceOperation::Update.as_str(),
        })?;
        let resolved = resolve::<Self>(ResourceOperation::Update, &self.path_ids())?;
        let target = ResourceContext::new(Self::NAME).with_id(id);
        send_record(self, client, resolved, target, idempotency_key, cancel).await
    }

    /// Deletes this record.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PathResolutionFailed`] if the record has no
    /// id, [`ResourceError::NotFound`] if it no longer exists, and any other
    /// terminal [`ResourceError`].
    async fn delete(
        &self,
        client: &RestClient,
        idempotency_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), ResourceError> {
        let id = self.get_id().ok_or(ResourceError::PathResolutionFailed {
            resource: Self::NAME,
            operation: ResourceOperation::Delete.as_str(),
        })?;
        let resolved = resolve::<Self>(ResourceOperation::Delete, &self.path_ids())?;
        let request = build_request::<Self>(
            resolved.http_method,
            &resolved.path,
            HashMap::new(),
            None,
            idempotency_key,
        )?;

        let target = ResourceContext::new(Self::NAME).with_id(id);
        client.run(request, &target, cancel).await?;
        Ok(())
    }
}

/// Converts a CamelCase name to snake_case.
fn snake_case(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 4);
    for (index, c) in name.char_indices() {
        if c.is_ascii_uppercase() {
            if index > 0 {
                key.push('_');
            }
            key.push(c.to_ascii_lowercase());
        } else {
            key.push(c);
        }
    }
    key
}

/// Resolves `operation` against the resource's path table and prefix.
fn resolve<R: Resource>(
    operation: ResourceOperation,
    ids: &[(&'static str, String)],
) -> Result<ResolvedPath, ResourceError> {
    let mut resolved =
        resolve_path(R::PATHS, operation, ids).ok_or(ResourceError::PathResolutionFailed {
            resource: R::NAME,
            operation: operation.as_str(),
        })?;
    if let Some(prefix) = R::PREFIX {
        resolved.path = format!("{prefix}/{}", resolved.path);
    }
    Ok(resolved)
}

async fn send_record<R: Resource>(
    record: &R,
    client: &RestClient,
    resolved: ResolvedPath,
    target: ResourceContext,
    idempotency_key: Option<&str>,
    cancel: &CancellationToken,
) -> Result<ResourceResponse<R>, ResourceError> {
    let body = codec::encode_envelope(record).map_err(|source| ResourceError::Malformed {
        source,
        request_id: None,
        context: RequestContext::new(R::NAME, resolved.http_method, resolved.path.as_str()),
    })?;
    let request = build_request::<R>(
        resolved.http_method,
        &resolved.path,
        HashMap::new(),
        Some(body),
        idempotency_key,
    )?;

    let (response, context) = client.run(request, &target, cancel).await?;
    let saved = decoded(
        codec::decode_one::<R>(response.body.as_bytes()),
        &response,
        context,
    )?;
    Ok(ResourceResponse::from_parts(saved, &response))
}

/// Builds a validated request for resource `R`.
pub(crate) fn build_request<R: Resource>(
    method: HttpMethod,
    path: &str,
    query: HashMap<String, String>,
    body: Option<Value>,
    idempotency_key: Option<&str>,
) -> Result<HttpRequest, ResourceError> {
    let mut builder = HttpRequest::builder(method, path);
    if !query.is_empty() {
        builder = builder.query(query);
    }
    if let Some(body) = body {
        builder = builder.body(body);
    }
    if let Some(key) = idempotency_key {
        builder = builder.idempotency_key(key);
    }
    builder
        .build()
        .map_err(|source| ResourceError::InvalidRequest {
            source,
            context: RequestContext::new(R::NAME, method, path),
        })
}

/// Attaches request diagnostics to a decoding failure.
pub(crate) fn decoded<T>(
    result: Result<T, CodecError>,
    response: &HttpResponse,
    context: RequestContext,
) -> Result<T, ResourceError> {
    result.map_err(|source| ResourceError::Malformed {
        source,
        request_id: response.request_id().map(ToString::to_string),
        context,
    })
}

/// Serializes list parameters, defaulting `limit` to the client's page size.
fn list_query<R: Resource>(
    client: &RestClient,
    params: Option<&R::AllParams>,
) -> Result<HashMap<String, String>, ResourceError> {
    let mut query = serialize_to_query::<R, _>(params)?;
    query
        .entry("limit".to_string())
        .or_insert_with(|| client.page_size().to_string());
    Ok(query)
}

/// Flattens a params struct into query parameters.
///
/// Nulls are dropped, arrays become comma-separated lists and nested
/// objects are sent as JSON text.
fn serialize_to_query<R: Resource, P: Serialize>(
    params: Option<&P>,
) -> Result<HashMap<String, String>, ResourceError> {
    let Some(params) = params else {
        return Ok(HashMap::new());
    };

    let value = serde_json::to_value(params).map_err(|e| ResourceError::InvalidParams {
        resource: R::NAME,
        reason: e.to_string(),
    })?;

    let map = match value {
        Value::Object(map) => map,
        Value::Null => return Ok(HashMap::new()),
        other => {
            return Err(ResourceError::InvalidParams {
                resource: R::NAME,
                reason: format!("expected a struct of parameters, got {other}"),
            })
        }
    };

    let mut query = HashMap::new();
    for (key, value) in map {
        let rendered = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect();
                if items.is_empty() {
                    continue;
                }
                items.join(",")
            }
            object @ Value::Object(_) => object.to_string(),
        };
        query.insert(key, rendered);
    }

    Ok(query)
}
