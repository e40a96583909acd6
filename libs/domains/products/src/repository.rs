use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProductResult;
use crate::models::{Product, ProductFilter, ProductListing};

/// Repository trait for Product persistence
///
/// This trait defines the data access interface for products.
/// Implementations can use different storage backends (in-memory, MongoDB).
///
/// Soft-delete scope is an explicit parameter on the read path rather than
/// an implicit storage-level filter; default callers pass
/// `include_deleted = false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Persist a newly constructed product.
    ///
    /// Backends with a storage-level unique name check surface a commit-time
    /// collision as `DuplicateName`.
    async fn insert(&self, product: Product) -> ProductResult<Product>;

    /// Get a product by ID; deleted products are only visible when
    /// `include_deleted` is set
    async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> ProductResult<Option<Product>>;

    /// Whether a non-deleted product with this name exists
    /// (case-insensitive comparison)
    async fn exists_by_name(&self, name: &str) -> ProductResult<bool>;

    /// List products matching the filter, with the pre-pagination total
    async fn list(&self, filter: ProductFilter) -> ProductResult<ProductListing>;

    /// Persist a mutation of an existing product.
    ///
    /// `loaded_stamp` is the concurrency stamp the product carried when it
    /// was fetched at the start of the workflow; the backend compares it
    /// against the stored row atomically at commit and fails with
    /// `Concurrency` on mismatch, so a racing writer cannot be overwritten.
    async fn save(&self, product: Product, loaded_stamp: Uuid) -> ProductResult<Product>;
}
