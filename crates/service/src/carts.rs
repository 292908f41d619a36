use std::sync::Arc;
use tracing::{debug, info, instrument};

use configs::OnMissing;
use models::cart::{positive_quantity, LineItemInput};
use models::{Cart, LineItem, PopulatedCart, PopulatedLineItem};

use crate::catalog::ProductLookup;
use crate::errors::ServiceError;
use crate::ids;
use crate::storage::JsonCollectionStore;

/// File-backed carts whose line-items reference catalog products.
///
/// Product references are checked against the catalog when a cart is written;
/// deleting a product later does not touch existing carts.
#[derive(Clone)]
pub struct CartStore {
    store: Arc<JsonCollectionStore<Cart>>,
    products: Arc<dyn ProductLookup>,
}

impl CartStore {
    /// Open the carts file at `path`, creating it empty on first use.
    pub async fn new<P: Into<std::path::PathBuf>>(
        path: P,
        products: Arc<dyn ProductLookup>,
    ) -> Result<Arc<Self>, ServiceError> {
        Self::with_options(path, OnMissing::InitializeEmpty, products).await
    }

    pub async fn with_options<P: Into<std::path::PathBuf>>(
        path: P,
        on_missing: OnMissing,
        products: Arc<dyn ProductLookup>,
    ) -> Result<Arc<Self>, ServiceError> {
        let store = JsonCollectionStore::<Cart>::new(path, on_missing).await?;
        Ok(Arc::new(Self { store, products }))
    }

    pub async fn list(&self) -> Result<Vec<Cart>, ServiceError> {
        self.store.load().await
    }

    pub async fn get_by_id(&self, cid: &str) -> Result<Cart, ServiceError> {
        self.store
            .load()
            .await?
            .into_iter()
            .find(|c| c.id == cid)
            .ok_or_else(|| ServiceError::not_found("cart"))
    }

    /// Create an empty cart.
    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<Cart, ServiceError> {
        let cart = Cart::new(ids::new_id());
        let created = cart.clone();
        self.store
            .mutate(move |carts| {
                carts.push(cart);
                Ok(())
            })
            .await?;
        info!(cart_id = %created.id, "cart_created");
        Ok(created)
    }

    /// Add one unit of `pid` to cart `cid`, accumulating onto an existing line.
    #[instrument(skip(self))]
    pub async fn add_product(&self, cid: &str, pid: &str) -> Result<Cart, ServiceError> {
        // Fail on the cart before consulting the catalog.
        self.get_by_id(cid).await?;
        self.ensure_product(pid).await?;
        let cart = self
            .store
            .mutate(|carts| {
                let cart = find_mut(carts, cid)?;
                cart.add_one(pid);
                Ok(cart.clone())
            })
            .await?;
        info!(cart_id = %cid, product_id = %pid, "cart_product_added");
        Ok(cart)
    }

    /// Drop the line for `pid`; an absent line is a silent no-op.
    #[instrument(skip(self))]
    pub async fn remove_product(&self, cid: &str, pid: &str) -> Result<Cart, ServiceError> {
        let (removed, cart) = self
            .store
            .mutate(|carts| {
                let cart = find_mut(carts, cid)?;
                let removed = cart.remove_line(pid);
                Ok((removed, cart.clone()))
            })
            .await?;
        if removed {
            info!(cart_id = %cid, product_id = %pid, "cart_product_removed");
        } else {
            debug!(cart_id = %cid, product_id = %pid, "product not in cart");
        }
        Ok(cart)
    }

    /// Replace every line-item of the cart. All entries are checked first; on
    /// the first bad entry nothing changes.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn replace_products(&self, cid: &str, items: Vec<LineItemInput>) -> Result<Cart, ServiceError> {
        self.get_by_id(cid).await?;
        let catalog = self.products.list().await?;
        let mut lines: Vec<LineItem> = Vec::with_capacity(items.len());
        for (index, raw) in items.iter().enumerate() {
            let line = raw
                .parse()
                .map_err(|e| ServiceError::Validation(format!("products[{}]: {}", index, e)))?;
            if !catalog.iter().any(|p| p.id == line.product) {
                return Err(ServiceError::Validation(format!(
                    "products[{}]: product {} does not exist",
                    index, line.product
                )));
            }
            // Keep one line per product: repeated ids add up.
            match lines.iter_mut().find(|l| l.product == line.product) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
                None => lines.push(line),
            }
        }
        let cart = self
            .store
            .mutate(move |carts| {
                let cart = find_mut(carts, cid)?;
                cart.products = lines;
                Ok(cart.clone())
            })
            .await?;
        info!(cart_id = %cid, lines = cart.products.len(), "cart_products_replaced");
        Ok(cart)
    }

    /// Set the quantity of an existing line.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, cid: &str, pid: &str, quantity: i64) -> Result<Cart, ServiceError> {
        let cart = self
            .store
            .mutate(|carts| {
                let cart = find_mut(carts, cid)?;
                let quantity = positive_quantity(quantity)?;
                let line = cart
                    .products
                    .iter_mut()
                    .find(|l| l.product == pid)
                    .ok_or_else(|| ServiceError::NotFound(format!("product {} is not in cart", pid)))?;
                line.quantity = quantity;
                Ok(cart.clone())
            })
            .await?;
        info!(cart_id = %cid, product_id = %pid, "cart_quantity_set");
        Ok(cart)
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear(&self, cid: &str) -> Result<Cart, ServiceError> {
        let cart = self
            .store
            .mutate(|carts| {
                let cart = find_mut(carts, cid)?;
                cart.products.clear();
                Ok(cart.clone())
            })
            .await?;
        info!(cart_id = %cid, "cart_cleared");
        Ok(cart)
    }

    /// Cart with each product id resolved against the catalog. Lines whose
    /// product no longer exists are left out. Never persisted.
    pub async fn get_populated(&self, cid: &str) -> Result<PopulatedCart, ServiceError> {
        let cart = self.get_by_id(cid).await?;
        let catalog = self.products.list().await?;
        let products = cart
            .products
            .iter()
            .filter_map(|line| {
                catalog
                    .iter()
                    .find(|p| p.id == line.product)
                    .map(|p| PopulatedLineItem { product: p.clone(), quantity: line.quantity })
            })
            .collect();
        Ok(PopulatedCart { id: cart.id, products })
    }

    async fn ensure_product(&self, pid: &str) -> Result<(), ServiceError> {
        match self.products.get_by_id(pid).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found("product")),
        }
    }
}

fn find_mut<'a>(carts: &'a mut [Cart], cid: &str) -> Result<&'a mut Cart, ServiceError> {
    carts
        .iter_mut()
        .find(|c| c.id == cid)
        .ok_or_else(|| ServiceError::not_found("cart"))
}
