//! Typed resources on top of the REST client.
//!
//! - [`codec`]: JSON envelopes to records and back, with [`Field`] for
//!   absent/null/value fields
//! - [`Resource`]: the trait records implement, with default fetch, list,
//!   count and mutation operations
//! - [`PageWalker`]: follows `page_info` cursors across a list
//! - [`ResourceResponse`] / [`Page`]: decoded data plus exchange metadata
//! - [`ResourceError`]: terminal failures of a logical request
//! - [`resources`]: the catalog records (`Product`, `Variant`, ...)
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use shopify_catalog::clients::CancellationToken;
//! use shopify_catalog::rest::Resource;
//! use shopify_catalog::rest::resources::{Product, Variant};
//!
//! let cancel = CancellationToken::new();
//!
//! let product = Product::fetch_one(&client, 632910392, None, &cancel).await?;
//! println!("{:?}", product.title);
//!
//! let mut walker = Variant::fetch_all_with_parent(&client, "product_id", 632910392, None, &cancel)?;
//! while let Some(page) = walker.next_page().await? {
//!     for variant in page.iter() {
//!         println!("- {:?}", variant.sku);
//!     }
//! }
//!
//! let total = Product::count(&client, None, &cancel).await?;
//! ```

pub mod codec;
mod errors;
mod pagination;
mod path;
mod resource;
mod response;

pub mod resources;

pub use codec::{CodecError, Field};
pub use errors::{RequestContext, ResourceContext, ResourceError};
pub use pagination::PageWalker;
pub use path::{
    build_path, get_path, resolve_path, PathIds, ResolvedPath, ResourceOperation, ResourcePath,
};
pub use resource::Resource;
pub use response::{Page, ResourceResponse};
