//! HTTP response types and Shopify header parsing.
//!
//! Three response headers drive the client core:
//!
//! - `X-Shopify-Shop-Api-Call-Limit` (`used/limit`) feeds the rate-limit governor
//! - `Link` carries the `rel="next"` / `rel="previous"` page cursors
//! - `Retry-After` tells a throttled caller how long to wait

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Rate-limit header name.
pub const CALL_LIMIT_HEADER: &str = "x-shopify-shop-api-call-limit";

/// Rate-limit usage parsed from the `X-Shopify-Shop-Api-Call-Limit` header.
///
/// The server does not guarantee `used <= limit`; out-of-order or stale
/// responses can transiently report more calls than the bucket holds.
///
/// # Example
///
/// ```rust
/// use shopify_catalog::clients::ApiCallLimit;
///
/// let limit = ApiCallLimit::parse("39/40").unwrap();
/// assert_eq!(limit.used, 39);
/// assert_eq!(limit.limit, 40);
/// assert_eq!(limit.remaining(), 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiCallLimit {
    /// Calls counted against the bucket.
    pub used: u32,
    /// Bucket size.
    pub limit: u32,
}

impl ApiCallLimit {
    /// Parses a `used/limit` header value.
    #[must_use]
    pub fn parse(header_value: &str) -> Option<Self> {
        let (used, limit) = header_value.trim().split_once('/')?;
        Some(Self {
            used: used.trim().parse().ok()?,
            limit: limit.trim().parse().ok()?,
        })
    }

    /// Calls left in the bucket, saturating at zero.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }
}

/// An opaque continuation token for a paginated list.
///
/// Cursors are produced by the server (the `page_info` parameter of a `Link`
/// header URL) and sent back verbatim. The client never inspects or builds
/// their contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wraps a token previously received from the server, e.g. one persisted
    /// to resume a walk later.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token exactly as the server issued it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pagination cursors parsed from the `Link` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Cursor for the previous page, if any.
    pub prev: Option<PageCursor>,
    /// Cursor for the next page, if any.
    pub next: Option<PageCursor>,
}

impl PaginationInfo {
    /// Parses a `Link` header of the form
    /// `<url>; rel="next", <url>; rel="previous"`.
    ///
    /// Relations other than `next` and `previous` are ignored, as are links
    /// without a `page_info` parameter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shopify_catalog::clients::PaginationInfo;
    ///
    /// let header = r#"<https://s.myshopify.com/admin/api/2025-10/products.json?limit=2&page_info=abc>; rel="next""#;
    /// let info = PaginationInfo::parse_link_header(header);
    /// assert_eq!(info.next.unwrap().as_str(), "abc");
    /// assert!(info.prev.is_none());
    /// ```
    #[must_use]
    pub fn parse_link_header(header_value: &str) -> Self {
        let mut result = Self::default();
        let mut rest = header_value;

        // URIs may contain commas, so link-values are delimited by `<...>`
        // and the first comma outside quotes after it.
        while let Some(start) = rest.find('<') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('>') else {
                break;
            };
            let url = &after[..end];
            let (params, remainder) = split_link_params(&after[end + 1..]);
            rest = remainder;

            let Some(cursor) = Self::extract_page_info(url) else {
                continue;
            };
            let rels = params.split(';').find_map(|part| {
                part.trim()
                    .strip_prefix("rel=")
                    .map(|rel| rel.trim_matches('"'))
            });
            for rel in rels.unwrap_or_default().split_whitespace() {
                match rel {
                    "next" => result.next = Some(cursor.clone()),
                    "previous" | "prev" => result.prev = Some(cursor.clone()),
                    _ => {}
                }
            }
        }

        result
    }

    /// Extracts and percent-decodes the `page_info` parameter from a URL.
    ///
    /// Decoding only undoes the URL transport encoding; the HTTP layer
    /// re-encodes the token when it goes back out as a query parameter.
    fn extract_page_info(url: &str) -> Option<PageCursor> {
        let (_, query) = url.split_once('?')?;
        query.split('&').find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key != "page_info" || value.is_empty() {
                return None;
            }
            let decoded = urlencoding::decode(value)
                .map_or_else(|_| value.to_string(), std::borrow::Cow::into_owned);
            Some(PageCursor(decoded))
        })
    }
}

/// Splits the parameters of one link-value from the rest of the header at
/// the first comma outside a quoted string.
fn split_link_params(tail: &str) -> (&str, &str) {
    let mut quoted = false;
    for (index, c) in tail.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => return (&tail[..index], &tail[index + 1..]),
            _ => {}
        }
    }
    (tail, "")
}

/// A response from a single HTTP exchange.
///
/// The body is kept as raw text; decoding into records is the codec's job so
/// that a malformed payload surfaces as a codec error rather than being
/// silently replaced.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lower-cased names, possibly multi-valued.
    pub headers: HashMap<String, Vec<String>>,
    /// The raw response body.
    pub body: String,
    /// Cursors parsed from the `Link` header.
    pub pagination: PaginationInfo,
    /// Usage parsed from the call-limit header.
    pub api_call_limit: Option<ApiCallLimit>,
    /// Delay requested by the `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing the Shopify-specific headers.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: impl Into<String>) -> Self {
        let first = |name: &str| headers.get(name).and_then(|values| values.first());

        let pagination = first("link")
            .map(|link| PaginationInfo::parse_link_header(link))
            .unwrap_or_default();

        let api_call_limit = first(CALL_LIMIT_HEADER).and_then(|value| ApiCallLimit::parse(value));

        let retry_after = first("retry-after")
            .and_then(|value| value.trim().parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Self {
            code,
            headers,
            body: body.into(),
            pagination,
            api_call_limit,
            retry_after,
        }
    }

    /// Returns `true` if the status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    /// Returns the `X-Shopify-API-Deprecated-Reason` header value, if present.
    #[must_use]
    pub fn deprecation_reason(&self) -> Option<&str> {
        self.header("x-shopify-api-deprecated-reason")
    }

    /// Parses the body as JSON, treating an empty body as `{}`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::json!({}));
        }
        serde_json::from_str(&self.body)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}
