//! In-memory repository, used for tests and for running the API without a
//! database. Products are kept in insertion order, which doubles as
//! creation order for the listing contract.

use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductFilter, ProductListing};
use crate::repository::ProductRepository;

#[derive(Default)]
pub struct InMemoryProductRepository {
    store: RwLock<Vec<Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: Product) -> ProductResult<Product> {
        let mut store = self
            .store
            .write()
            .map_err(|e| ProductError::Database(e.to_string()))?;

        // Commit-time backstop for the service-level uniqueness check.
        let name_lower = product.name().to_lowercase();
        if store
            .iter()
            .any(|p| !p.is_deleted() && p.name().to_lowercase() == name_lower)
        {
            return Err(ProductError::DuplicateName(product.name().to_string()));
        }

        store.push(product.clone());
        Ok(product)
    }

    async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> ProductResult<Option<Product>> {
        let store = self
            .store
            .read()
            .map_err(|e| ProductError::Database(e.to_string()))?;

        Ok(store
            .iter()
            .find(|p| p.id() == id && (include_deleted || !p.is_deleted()))
            .cloned())
    }

    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let store = self
            .store
            .read()
            .map_err(|e| ProductError::Database(e.to_string()))?;

        let name_lower = name.to_lowercase();
        Ok(store
            .iter()
            .any(|p| !p.is_deleted() && p.name().to_lowercase() == name_lower))
    }

    async fn list(&self, filter: ProductFilter) -> ProductResult<ProductListing> {
        let store = self
            .store
            .read()
            .map_err(|e| ProductError::Database(e.to_string()))?;

        let matching: Vec<&Product> = store.iter().filter(|p| filter.matches(p)).collect();
        let total_count = matching.len() as u64;

        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size as usize)
            .cloned()
            .collect();

        Ok(ProductListing { items, total_count })
    }

    async fn save(&self, product: Product, loaded_stamp: Uuid) -> ProductResult<Product> {
        let mut store = self
            .store
            .write()
            .map_err(|e| ProductError::Database(e.to_string()))?;

        let stored = store
            .iter_mut()
            .find(|p| p.id() == product.id())
            .ok_or(ProductError::NotFound(product.id()))?;

        if stored.concurrency_stamp() != loaded_stamp {
            return Err(ProductError::Concurrency(product.id()));
        }

        *stored = product.clone();
        Ok(product)
    }
}
