use std::sync::Arc;

use service::{CartStore, ProductStore};

use crate::realtime::Broadcaster;

/// Shared handler state. Stores are cheap to clone behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<ProductStore>,
    pub carts: Arc<CartStore>,
    pub events: Broadcaster,
}
