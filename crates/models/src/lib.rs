//! Document types persisted by the catalog and cart stores.
//! - `product`: catalog entries plus create/patch inputs.
//! - `cart`: carts, line-items and the populated (joined) projection.

pub mod errors;
pub mod product;
pub mod cart;

pub use cart::{Cart, LineItem, PopulatedCart, PopulatedLineItem};
pub use product::{Product, ProductInput, ProductPatch};
