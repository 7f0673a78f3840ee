//! Cursor-based walks over paginated lists.
//!
//! The Admin REST API pages lists with opaque `page_info` cursors delivered
//! in the `Link` header. A [`PageWalker`] fetches one page per call, follows
//! the `next` cursor and stops on the first page without one. Empty pages
//! that still carry a cursor are followed.
//!
//! Pages are fetched one at a time: page N+1 is requested only after page N
//! revealed its cursor. Each fetch is an independent logical request, so it
//! passes through the governor and the retry policy on its own.
//!
//! The server does not snapshot the list. Records created or deleted while a
//! walk is in progress may be skipped or seen twice.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use shopify_catalog::clients::CancellationToken;
//! use shopify_catalog::rest::Resource;
//! use shopify_catalog::rest::resources::Product;
//!
//! let cancel = CancellationToken::new();
//! let products: Vec<Product> = Product::fetch_all(&client, None, &cancel)?
//!     .items()
//!     .try_collect()
//!     .await?;
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;

use futures::stream::{self, Stream, TryStreamExt};

use crate::clients::{CancellationToken, HttpMethod, PageCursor, RestClient};
use crate::rest::codec;
use crate::rest::resource::{build_request, decoded};
use crate::rest::{Page, Resource, ResourceContext, ResourceError, ResourceResponse};

/// Query parameters the platform accepts next to `page_info`.
const CONTINUATION_PARAMS: &[&str] = &["limit", "fields"];

#[derive(Clone, Debug)]
enum WalkState {
    Start,
    Next(PageCursor),
    Done,
}

/// Walks every page of a list request.
///
/// After a page fails the walker yields that error once and is then
/// exhausted; [`restart`](Self::restart) begins a fresh walk from the first
/// page.
#[derive(Debug)]
pub struct PageWalker<'c, R> {
    client: &'c RestClient,
    path: String,
    query: HashMap<String, String>,
    cancel: CancellationToken,
    state: WalkState,
    pages_fetched: u32,
    _resource: PhantomData<fn() -> R>,
}

impl<'c, R: Resource> PageWalker<'c, R> {
    pub(crate) fn new(
        client: &'c RestClient,
        path: String,
        query: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            path,
            query,
            cancel,
            state: WalkState::Start,
            pages_fetched: 0,
            _resource: PhantomData,
        }
    }

    /// Number of pages fetched successfully so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Returns `true` once the last page was returned or a fetch failed.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.state, WalkState::Done)
    }

    /// Returns a walker over the same list, starting at the first page.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self::new(
            self.client,
            self.path.clone(),
            self.query.clone(),
            self.cancel.clone(),
        )
    }

    /// Fetches the next page.
    ///
    /// Returns `Ok(None)` once the walk is complete.
    ///
    /// # Errors
    ///
    /// Returns the [`ResourceError`] of the failed page fetch. Later calls
    /// return `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Page<R>>, ResourceError> {
        let query = match std::mem::replace(&mut self.state, WalkState::Done) {
            WalkState::Done => return Ok(None),
            WalkState::Start => self.query.clone(),
            WalkState::Next(cursor) => continuation_query(&self.query, &cursor),
        };

        let page = fetch_list_page::<R>(self.client, &self.path, query, &self.cancel).await?;
        self.pages_fetched += 1;

        if let Some(cursor) = page.next_cursor() {
            self.state = WalkState::Next(cursor.clone());
        }

        tracing::debug!(
            resource = R::NAME,
            page = self.pages_fetched,
            items = page.len(),
            more = page.has_next_page(),
            "Fetched page"
        );

        Ok(Some(page))
    }

    /// Converts the walker into a stream of pages.
    ///
    /// The stream ends after the last page, or right after yielding an
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<R>, ResourceError>> + 'c
    where
        R: 'c,
    {
        stream::try_unfold(self, |mut walker| async move {
            Ok(walker.next_page().await?.map(|page| (page, walker)))
        })
    }

    /// Converts the walker into a stream of records across all pages.
    pub fn items(self) -> impl Stream<Item = Result<R, ResourceError>> + 'c
    where
        R: 'c,
    {
        self.into_stream()
            .map_ok(|page| stream::iter(page.into_inner().into_iter().map(Ok)))
            .try_flatten()
    }
}

/// Fetches one page of `path` with the given query.
pub(crate) async fn fetch_list_page<R: Resource>(
    client: &RestClient,
    path: &str,
    query: HashMap<String, String>,
    cancel: &CancellationToken,
) -> Result<Page<R>, ResourceError> {
    let request = build_request::<R>(HttpMethod::Get, path, query, None, None)?;
    let (response, context) = client
        .run(request, &ResourceContext::new(R::NAME), cancel)
        .await?;
    let records = decoded(
        codec::decode_many::<R>(response.body.as_bytes()),
        &response,
        context,
    )?;
    Ok(ResourceResponse::from_parts(records, &response))
}

/// Builds the query of a follow-up page: the cursor plus `limit` and
/// `fields` from the original filters.
pub(crate) fn continuation_query(
    original: &HashMap<String, String>,
    cursor: &PageCursor,
) -> HashMap<String, String> {
    let mut query: HashMap<String, String> = original
        .iter()
        .filter(|(key, _)| CONTINUATION_PARAMS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    query.insert("page_info".to_string(), cursor.as_str().to_string());
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuation_query_drops_filters() {
        let original: HashMap<String, String> = [
            ("limit", "2"),
            ("fields", "id,title"),
            ("vendor", "Acme"),
            ("status", "active"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let query = continuation_query(&original, &PageCursor::new("abc"));

        assert_eq!(query.len(), 3);
        assert_eq!(query["limit"], "2");
        assert_eq!(query["fields"], "id,title");
        assert_eq!(query["page_info"], "abc");
        assert!(!query.contains_key("vendor"));
    }

    #[test]
    fn test_continuation_query_replaces_stale_cursor() {
        let original: HashMap<String, String> = [("page_info", "old")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let query = continuation_query(&original, &PageCursor::new("new"));
        assert_eq!(query["page_info"], "new");
        assert_eq!(query.len(), 1);
    }
}
