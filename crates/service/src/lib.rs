//! Service layer: file-backed catalog and cart stores.
//! - `storage` holds the shared read/parse/write primitive.
//! - `catalog` and `carts` own one collection each; carts consult the catalog
//!   only to check references.
//! - `pagination` shapes catalog listings; `notify` carries change events out.

pub mod errors;
pub mod ids;
pub mod storage;
pub mod notify;
pub mod catalog;
pub mod carts;
pub mod pagination;

pub use carts::CartStore;
pub use catalog::{ProductLookup, ProductStore};
pub use errors::ServiceError;
