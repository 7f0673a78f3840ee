//! Catalog records.
//!
//! - [`Product`]: the catalog entry, with its variants, options, images and
//!   metafields inline
//! - [`Variant`]: a purchasable version of a product, addressed under
//!   `products/{product_id}/variants`
//! - [`ProductOption`], [`ProductImage`], [`Metafield`]: records embedded in
//!   a product document
//!
//! Every record field is a [`Field`](crate::rest::Field) and every record
//! keeps unknown server fields in its `extra` map, so records decoded from a
//! newer API version re-encode without loss.

mod common;
mod product;
mod variant;

pub use common::{Metafield, ProductImage, ProductOption};
pub use product::{Product, ProductCountParams, ProductFindParams, ProductListParams, ProductStatus};
pub use variant::{Variant, VariantFindParams, VariantListParams, WeightUnit};
