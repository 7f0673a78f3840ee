//! Typed results of resource operations.
//!
//! [`ResourceResponse<T>`] pairs decoded data with the metadata of the
//! exchange that produced it: page cursors, the rate-limit snapshot and the
//! request id. It derefs to `T`, so a `Page<Product>` can be iterated like a
//! `Vec<Product>`.
//!
//! ```rust
//! use shopify_catalog::clients::{ApiCallLimit, PageCursor, PaginationInfo};
//! use shopify_catalog::rest::ResourceResponse;
//!
//! let page = ResourceResponse::new(
//!     vec!["board", "wax"],
//!     PaginationInfo { prev: None, next: Some(PageCursor::new("abc")) },
//!     Some(ApiCallLimit { used: 3, limit: 40 }),
//!     Some("req-1".to_string()),
//! );
//!
//! assert_eq!(page.len(), 2);
//! assert_eq!(page.next_cursor().map(PageCursor::as_str), Some("abc"));
//! assert_eq!(page.rate_limit().map(|l| l.remaining()), Some(37));
//! ```

use std::ops::{Deref, DerefMut};

use crate::clients::{ApiCallLimit, HttpResponse, PageCursor, PaginationInfo};

/// Decoded data plus the metadata of the exchange that produced it.
#[derive(Debug, Clone)]
pub struct ResourceResponse<T> {
    data: T,
    pagination: PaginationInfo,
    rate_limit: Option<ApiCallLimit>,
    request_id: Option<String>,
}

/// One page of a list: the records plus next/previous cursors.
pub type Page<R> = ResourceResponse<Vec<R>>;

impl<T> ResourceResponse<T> {
    /// Creates a response from its parts.
    #[must_use]
    pub const fn new(
        data: T,
        pagination: PaginationInfo,
        rate_limit: Option<ApiCallLimit>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            data,
            pagination,
            rate_limit,
            request_id,
        }
    }

    /// Attaches `data` to the metadata of `response`.
    #[must_use]
    pub fn from_parts(data: T, response: &HttpResponse) -> Self {
        Self {
            data,
            pagination: response.pagination.clone(),
            rate_limit: response.api_call_limit,
            request_id: response.request_id().map(ToString::to_string),
        }
    }

    /// Consumes the response, returning the data.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Returns the data.
    #[must_use]
    pub const fn data(&self) -> &T {
        &self.data
    }

    /// Cursor of the following page; `None` on the last page.
    #[must_use]
    pub const fn next_cursor(&self) -> Option<&PageCursor> {
        self.pagination.next.as_ref()
    }

    /// Cursor of the preceding page; `None` on the first page.
    #[must_use]
    pub const fn prev_cursor(&self) -> Option<&PageCursor> {
        self.pagination.prev.as_ref()
    }

    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.pagination.next.is_some()
    }

    #[must_use]
    pub const fn has_prev_page(&self) -> bool {
        self.pagination.prev.is_some()
    }

    /// Returns both cursors.
    #[must_use]
    pub const fn pagination(&self) -> &PaginationInfo {
        &self.pagination
    }

    /// Rate-limit usage reported with this response.
    #[must_use]
    pub const fn rate_limit(&self) -> Option<&ApiCallLimit> {
        self.rate_limit.as_ref()
    }

    /// The `X-Request-Id` of the exchange, for support requests.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Transforms the data, keeping the metadata.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> ResourceResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ResourceResponse {
            data: f(self.data),
            pagination: self.pagination,
            rate_limit: self.rate_limit,
            request_id: self.request_id,
        }
    }
}

impl<T> Deref for ResourceResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for ResourceResponse<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceResponse<String>>();
    assert_send_sync::<Page<String>>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), vec![(*v).to_string()]))
            .collect()
    }

    #[test]
    fn test_from_parts_copies_exchange_metadata() {
        let response = HttpResponse::new(
            200,
            headers(&[
                (
                    "link",
                    r#"<https://shop.myshopify.com/admin/api/2025-10/products.json?page_info=p1>; rel="previous", <https://shop.myshopify.com/admin/api/2025-10/products.json?limit=2&page_info=n1>; rel="next""#,
                ),
                ("x-shopify-shop-api-call-limit", "12/40"),
                ("x-request-id", "req-42"),
            ]),
            "{}",
        );

        let page: Page<u32> = ResourceResponse::from_parts(vec![1, 2], &response);

        assert_eq!(page.len(), 2);
        assert_eq!(page.next_cursor(), Some(&PageCursor::new("n1")));
        assert_eq!(page.prev_cursor(), Some(&PageCursor::new("p1")));
        assert!(page.has_next_page());
        assert!(page.has_prev_page());
        assert_eq!(page.rate_limit(), Some(&ApiCallLimit { used: 12, limit: 40 }));
        assert_eq!(page.request_id(), Some("req-42"));
    }

    #[test]
    fn test_last_page_has_no_next_cursor() {
        let response = HttpResponse::new(200, HashMap::new(), "{}");
        let page: Page<u32> = ResourceResponse::from_parts(Vec::new(), &response);

        assert!(page.is_empty());
        assert!(!page.has_next_page());
        assert!(page.next_cursor().is_none());
        assert!(page.rate_limit().is_none());
        assert!(page.request_id().is_none());
    }

    #[test]
    fn test_map_and_deref_mut_keep_metadata() {
        let mut response = ResourceResponse::new(
            vec![1, 2, 3],
            PaginationInfo {
                prev: None,
                next: Some(PageCursor::new("abc")),
            },
            None,
            Some("req".to_string()),
        );
        response.push(4);

        let total = response.map(|items| items.iter().sum::<i32>());
        assert_eq!(*total, 10);
        assert_eq!(total.next_cursor().map(PageCursor::as_str), Some("abc"));
        assert_eq!(total.request_id(), Some("req"));
        assert_eq!(total.into_inner(), 10);
    }
}
