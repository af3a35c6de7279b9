use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::actions::{ProductAction, ProductActionResult};
use super::error::ProductError;
use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::domain::{Product, ProductCreate, ProductPatch, ProductSnapshot};

/// Read-only view of the catalog consumed by checkout.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Current price and name, or `None` for an unknown id.
    async fn lookup_product(&self, id: &str) -> Result<Option<ProductSnapshot>, ProductError>;
}

pub type DynProductCatalog = Arc<dyn ProductCatalog>;

impl From<FrameworkError> for ProductError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => ProductError::NotFound(id),
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}

/// Client for interacting with the Product actor.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl ProductClient {
    pub fn new(inner: ResourceClient<Product>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn create_product(&self, params: ProductCreate) -> Result<String, ProductError> {
        debug!("Sending request");
        let price = params.price;
        self.inner.create(params).await.map_err(|e| match e {
            FrameworkError::Rejected(_) => ProductError::InvalidPrice(price),
            other => other.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: String) -> Result<Option<Product>, ProductError> {
        debug!("Sending request");
        Ok(self.inner.get(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ProductError> {
        debug!("Sending request");
        Ok(self.inner.list().await?)
    }

    #[instrument(skip(self))]
    pub async fn update_product(&self, id: String, patch: ProductPatch) -> Result<Product, ProductError> {
        debug!("Sending request");
        let price = patch.price.unwrap_or_default();
        self.inner.update(id, patch).await.map_err(|e| match e {
            FrameworkError::Rejected(_) => ProductError::InvalidPrice(price),
            other => other.into(),
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: String) -> Result<(), ProductError> {
        debug!("Sending request");
        Ok(self.inner.delete(id).await?)
    }

    #[instrument(skip(self))]
    pub async fn snapshot(&self, id: String) -> Result<ProductSnapshot, ProductError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::Snapshot).await? {
            ProductActionResult::Snapshot(snapshot) => Ok(snapshot),
        }
    }
}

#[async_trait]
impl ProductCatalog for ProductClient {
    async fn lookup_product(&self, id: &str) -> Result<Option<ProductSnapshot>, ProductError> {
        match self.snapshot(id.to_string()).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(ProductError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
