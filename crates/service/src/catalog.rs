use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use configs::{IdStrategy, OnMissing};
use models::{Product, ProductInput, ProductPatch};

use crate::errors::ServiceError;
use crate::ids;
use crate::notify::{NoopAnnouncer, ProductAnnouncer};
use crate::storage::JsonCollectionStore;

/// Read-only view of the catalog used by other stores for reference checks.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, ServiceError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, ServiceError>;
}

/// File-backed product catalog.
#[derive(Clone)]
pub struct ProductStore {
    store: Arc<JsonCollectionStore<Product>>,
    id_strategy: IdStrategy,
    announcer: Arc<dyn ProductAnnouncer>,
}

impl ProductStore {
    /// Open the catalog at `path`. By default a missing file is an error.
    pub async fn new<P: Into<std::path::PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        Self::with_options(path, OnMissing::Fail, IdStrategy::Random, Arc::new(NoopAnnouncer)).await
    }

    pub async fn with_options<P: Into<std::path::PathBuf>>(
        path: P,
        on_missing: OnMissing,
        id_strategy: IdStrategy,
        announcer: Arc<dyn ProductAnnouncer>,
    ) -> Result<Arc<Self>, ServiceError> {
        let store = JsonCollectionStore::<Product>::new(path, on_missing).await?;
        Ok(Arc::new(Self { store, id_strategy, announcer }))
    }

    /// All products in stored order.
    pub async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        self.store.load().await
    }

    /// `Ok(None)` when no product has this id; `Err` only for storage failures.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Product>, ServiceError> {
        Ok(self.store.load().await?.into_iter().find(|p| p.id == id))
    }

    /// Append a new product and return the whole updated catalog.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: ProductInput) -> Result<Vec<Product>, ServiceError> {
        input.validate()?;
        let strategy = self.id_strategy;
        let (created, all) = self
            .store
            .mutate(move |products| {
                let id = match strategy {
                    IdStrategy::Random => ids::new_id(),
                    IdStrategy::CallerSupplied => {
                        let id = input
                            .id
                            .clone()
                            .ok_or_else(|| ServiceError::Validation("id is required".into()))?;
                        if products.iter().any(|p| p.id == id) {
                            return Err(ServiceError::Validation(format!("product id {} already exists", id)));
                        }
                        id
                    }
                };
                let product = input.into_product(id);
                products.push(product.clone());
                Ok((product, products.clone()))
            })
            .await?;
        info!(product_id = %created.id, "product_created");
        self.announcer.product_created(&created);
        Ok(all)
    }

    /// Merge `patch` into the product with `id` and return the updated catalog.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: ProductPatch) -> Result<Vec<Product>, ServiceError> {
        let all = self
            .store
            .mutate(|products| {
                let existing = products
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| ServiceError::not_found("product"))?;
                existing.apply_patch(patch)?;
                Ok(products.clone())
            })
            .await?;
        info!(product_id = %id, "product_updated");
        Ok(all)
    }

    /// Remove the product with `id` if present; an unknown id is a silent no-op.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> Result<Vec<Product>, ServiceError> {
        let (removed, all) = self
            .store
            .mutate(|products| {
                let before = products.len();
                products.retain(|p| p.id != id);
                Ok((before != products.len(), products.clone()))
            })
            .await?;
        if removed {
            info!(product_id = %id, "product_deleted");
            self.announcer.product_deleted(id);
        } else {
            debug!(product_id = %id, "delete of unknown product ignored");
        }
        Ok(all)
    }
}

#[async_trait]
impl ProductLookup for ProductStore {
    async fn list(&self) -> Result<Vec<Product>, ServiceError> { self.list().await }
    async fn get_by_id(&self, id: &str) -> Result<Option<Product>, ServiceError> { self.get_by_id(id).await }
}
