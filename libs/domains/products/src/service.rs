//! Product Service - domain workflows
//!
//! Orchestrates the multi-step workflows the entity alone cannot enforce:
//! cross-entity name uniqueness and the optimistic-concurrency gate.
//! The ordering inside `update_product` is deliberate and load-bearing:
//! concurrency check, then uniqueness check, then field mutation — a stale
//! caller is always rejected before any uniqueness decision or side effect.

use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CreateProductRequest, Product, ProductFilter, ProductListing, UpdateProductRequest,
};
use crate::repository::ProductRepository;

/// Product service providing the create/update/delete/get/list workflows.
///
/// Never caches entities across calls; every workflow re-fetches fresh
/// state and fails fast on the first violated precondition, so no partial
/// mutation is ever persisted.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    /// Create a new ProductService with the given repository
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Create a new product
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: CreateProductRequest) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        if self.repository.exists_by_name(&input.name).await? {
            return Err(ProductError::DuplicateName(input.name.clone()));
        }

        let product = Product::new(&input.name, &input.category, input.price)?;
        self.repository.insert(product).await
    }

    /// Get a non-deleted product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> ProductResult<Product> {
        self.repository
            .get_by_id(id, false)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Update an existing product
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductRequest,
    ) -> ProductResult<Product> {
        input
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        let mut product = self
            .repository
            .get_by_id(id, false)
            .await?
            .ok_or(ProductError::NotFound(id))?;
        let loaded_stamp = product.concurrency_stamp();

        // Stale callers are rejected here, before the uniqueness decision.
        product.check_and_rotate_stamp(input.concurrency_stamp)?;

        // Re-check uniqueness only when the name actually changes.
        if product.name().to_lowercase() != input.name.to_lowercase()
            && self.repository.exists_by_name(&input.name).await?
        {
            return Err(ProductError::DuplicateName(input.name.clone()));
        }

        product.set_name(&input.name)?;
        product.set_category(&input.category)?;
        product.set_price(input.price)?;

        self.repository.save(product, loaded_stamp).await
    }

    /// Soft-delete a product
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> ProductResult<Product> {
        let mut product = self
            .repository
            .get_by_id(id, false)
            .await?
            .ok_or(ProductError::NotFound(id))?;
        let loaded_stamp = product.concurrency_stamp();

        product.mark_deleted();
        self.repository.save(product, loaded_stamp).await
    }

    /// List products with filters and pagination
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: ProductFilter) -> ProductResult<ProductListing> {
        filter
            .validate()
            .map_err(|e| ProductError::Validation(e.to_string()))?;

        self.repository.list(filter).await
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockProductRepository;

    fn create_request(name: &str) -> CreateProductRequest {
        CreateProductRequest {
            name: name.to_string(),
            category: "Electronics".to_string(),
            price: 99_999,
        }
    }

    fn update_request(name: &str, stamp: Uuid) -> UpdateProductRequest {
        UpdateProductRequest {
            name: name.to_string(),
            category: "Electronics".to_string(),
            price: 49_999,
            concurrency_stamp: stamp,
        }
    }

    #[tokio::test]
    async fn create_succeeds_when_name_is_unique() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_exists_by_name()
            .with(mockall::predicate::eq("Laptop"))
            .returning(|_| Ok(false));
        mock_repo.expect_insert().returning(Ok);

        let service = ProductService::new(mock_repo);
        let product = service.create_product(create_request("Laptop")).await.unwrap();

        assert_eq!(product.name(), "Laptop");
        assert!(!product.concurrency_stamp().is_nil());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_exists_by_name().returning(|_| Ok(true));

        let service = ProductService::new(mock_repo);
        let result = service.create_product(create_request("Laptop")).await;

        assert!(matches!(result, Err(ProductError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn create_rejects_non_positive_price_before_touching_storage() {
        // No expectations set: any repository call would panic the mock.
        let mock_repo = MockProductRepository::new();
        let service = ProductService::new(mock_repo);

        let mut input = create_request("Laptop");
        input.price = 0;
        let result = service.create_product(input).await;

        assert!(matches!(result, Err(ProductError::Validation(_))));
    }

    #[tokio::test]
    async fn update_applies_fields_and_rotates_stamp() {
        let existing = Product::new("Old Name", "Category", 10_000).unwrap();
        let id = existing.id();
        let stamp = existing.concurrency_stamp();

        let mut mock_repo = MockProductRepository::new();
        let fetched = existing.clone();
        mock_repo
            .expect_get_by_id()
            .withf(move |got, include_deleted| *got == id && !include_deleted)
            .returning(move |_, _| Ok(Some(fetched.clone())));
        mock_repo
            .expect_exists_by_name()
            .with(mockall::predicate::eq("New Name"))
            .returning(|_| Ok(false));
        mock_repo
            .expect_save()
            .withf(move |_, loaded| *loaded == stamp)
            .returning(|product, _| Ok(product));

        let service = ProductService::new(mock_repo);
        let updated = service
            .update_product(id, update_request("New Name", stamp))
            .await
            .unwrap();

        assert_eq!(updated.name(), "New Name");
        assert_eq!(updated.price(), 49_999);
        assert_ne!(updated.concurrency_stamp(), stamp);
    }

    #[tokio::test]
    async fn update_rejects_stale_stamp_before_any_side_effect() {
        let existing = Product::new("Product", "Category", 10_000).unwrap();
        let id = existing.id();

        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(move |_, _| Ok(Some(existing.clone())));
        // Neither exists_by_name nor save is expected: the stale caller
        // must be rejected before the uniqueness check runs.

        let service = ProductService::new(mock_repo);
        let result = service
            .update_product(id, update_request("New Name", Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(ProductError::Concurrency(_))));
    }

    #[tokio::test]
    async fn update_skips_uniqueness_check_when_name_is_unchanged() {
        let existing = Product::new("Product", "Category", 10_000).unwrap();
        let id = existing.id();
        let stamp = existing.concurrency_stamp();

        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(move |_, _| Ok(Some(existing.clone())));
        // exists_by_name is deliberately not expected: a case-only change
        // counts as the same name.
        mock_repo.expect_save().returning(|product, _| Ok(product));

        let service = ProductService::new(mock_repo);
        let updated = service
            .update_product(id, update_request("PRODUCT", stamp))
            .await
            .unwrap();

        assert_eq!(updated.name(), "PRODUCT");
    }

    #[tokio::test]
    async fn update_rejects_rename_to_taken_name() {
        let existing = Product::new("Product 1", "Category", 10_000).unwrap();
        let id = existing.id();
        let stamp = existing.concurrency_stamp();

        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(move |_, _| Ok(Some(existing.clone())));
        mock_repo
            .expect_exists_by_name()
            .with(mockall::predicate::eq("Product 2"))
            .returning(|_| Ok(true));

        let service = ProductService::new(mock_repo);
        let result = service
            .update_product(id, update_request("Product 2", stamp))
            .await;

        assert!(matches!(result, Err(ProductError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn update_rejects_unknown_id() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_get_by_id().returning(|_, _| Ok(None));

        let service = ProductService::new(mock_repo);
        let result = service
            .update_product(Uuid::new_v4(), update_request("Name", Uuid::new_v4()))
            .await;

        assert!(matches!(result, Err(ProductError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_marks_product_deleted() {
        let existing = Product::new("Product", "Category", 10_000).unwrap();
        let id = existing.id();
        let stamp = existing.concurrency_stamp();

        let mut mock_repo = MockProductRepository::new();
        mock_repo
            .expect_get_by_id()
            .returning(move |_, _| Ok(Some(existing.clone())));
        mock_repo
            .expect_save()
            .withf(move |product, loaded| product.is_deleted() && *loaded == stamp)
            .returning(|product, _| Ok(product));

        let service = ProductService::new(mock_repo);
        let deleted = service.delete_product(id).await.unwrap();

        assert!(deleted.is_deleted());
    }

    #[tokio::test]
    async fn delete_rejects_unknown_id() {
        let mut mock_repo = MockProductRepository::new();
        mock_repo.expect_get_by_id().returning(|_, _| Ok(None));

        let service = ProductService::new(mock_repo);
        let result = service.delete_product(Uuid::new_v4()).await;

        assert!(matches!(result, Err(ProductError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_rejects_zero_page() {
        let mock_repo = MockProductRepository::new();
        let service = ProductService::new(mock_repo);

        let filter = ProductFilter {
            page: 0,
            ..Default::default()
        };
        let result = service.list_products(filter).await;

        assert!(matches!(result, Err(ProductError::Validation(_))));
    }
}
