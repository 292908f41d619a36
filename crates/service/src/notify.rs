//! Change notifications for catalog listeners.
//!
//! The store only knows this trait; the transport that fans events out to
//! connected clients lives in the server crate.

use serde::Serialize;

use models::Product;

/// Wire shape of a catalog change, tagged the way browser clients expect.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ProductEvent {
    #[serde(rename = "productAdded")]
    Created(Product),
    /// Carries the deleted id, always as a string.
    #[serde(rename = "productDeleted")]
    Deleted(String),
}

/// Fire-and-forget sink for catalog changes. Implementations must not block
/// and must not fail the store operation that triggered them.
pub trait ProductAnnouncer: Send + Sync {
    fn product_created(&self, product: &Product);
    fn product_deleted(&self, id: &str);
}

/// Announcer for stores nobody listens to.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnnouncer;

impl ProductAnnouncer for NoopAnnouncer {
    fn product_created(&self, _product: &Product) {}
    fn product_deleted(&self, _id: &str) {}
}
