use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ProductError, ProductResult};

/// Maximum length of a product name
pub const NAME_MAX_LEN: usize = 100;
/// Maximum length of a product category
pub const CATEGORY_MAX_LEN: usize = 50;

/// Product entity.
///
/// Fields are private; the only ways to change state are construction and
/// the mutation methods below, which enforce the entity invariants (price
/// strictly positive, name/category non-empty and within length bounds,
/// soft delete never reverting, concurrency stamp rotated on update).
///
/// `Deserialize` exists solely so persistence adapters can reconstruct an
/// entity from its stored representation; it is not an API input type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    id: Uuid,
    name: String,
    category: String,
    /// Price in cents (minor currency units, for precision)
    price: i64,
    created_at: DateTime<Utc>,
    is_deleted: bool,
    concurrency_stamp: Uuid,
}

impl Product {
    /// Construct a new product with a fresh id, creation timestamp, and
    /// random concurrency stamp. Fails with `Validation` when any field
    /// violates its invariant.
    pub fn new(name: &str, category: &str, price: i64) -> ProductResult<Self> {
        validate_name(name)?;
        validate_category(category)?;
        validate_price(price)?;

        Ok(Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            created_at: Utc::now(),
            is_deleted: false,
            concurrency_stamp: Uuid::new_v4(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> i64 {
        self.price
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn concurrency_stamp(&self) -> Uuid {
        self.concurrency_stamp
    }

    pub fn set_name(&mut self, name: &str) -> ProductResult<()> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn set_category(&mut self, category: &str) -> ProductResult<()> {
        validate_category(category)?;
        self.category = category.to_string();
        Ok(())
    }

    pub fn set_price(&mut self, price: i64) -> ProductResult<()> {
        validate_price(price)?;
        self.price = price;
        Ok(())
    }

    /// Soft-delete the product. Idempotent in effect; the service performs
    /// the prior existence check.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Optimistic-concurrency gate: fails with `Concurrency` when
    /// `expected` does not match the current stamp, otherwise assigns a
    /// new random stamp. Must run before any other mutation in an update
    /// workflow, exactly once per mutation.
    pub fn check_and_rotate_stamp(&mut self, expected: Uuid) -> ProductResult<()> {
        if self.concurrency_stamp != expected {
            return Err(ProductError::Concurrency(self.id));
        }
        self.concurrency_stamp = Uuid::new_v4();
        Ok(())
    }
}

fn validate_name(name: &str) -> ProductResult<()> {
    if name.trim().is_empty() {
        return Err(ProductError::Validation(
            "Product name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(ProductError::Validation(format!(
            "Product name must be at most {} characters",
            NAME_MAX_LEN
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> ProductResult<()> {
    if category.trim().is_empty() {
        return Err(ProductError::Validation(
            "Product category must not be empty".to_string(),
        ));
    }
    if category.chars().count() > CATEGORY_MAX_LEN {
        return Err(ProductError::Validation(format!(
            "Product category must be at most {} characters",
            CATEGORY_MAX_LEN
        )));
    }
    Ok(())
}

fn validate_price(price: i64) -> ProductResult<()> {
    if price <= 0 {
        return Err(ProductError::Validation(
            "Price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Response shape for a product
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    /// Price in cents
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
    /// Opaque token to echo back on update
    pub concurrency_stamp: Uuid,
}

impl From<&Product> for ProductDto {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id(),
            name: product.name().to_string(),
            category: product.category().to_string(),
            price: product.price(),
            created_at: product.created_at(),
            is_deleted: product.is_deleted(),
            concurrency_stamp: product.concurrency_stamp(),
        }
    }
}

/// DTO for creating a new product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    /// Price in cents
    #[validate(range(min = 1))]
    pub price: i64,
}

/// DTO for updating an existing product
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    /// Price in cents
    #[validate(range(min = 1))]
    pub price: i64,
    /// Stamp from the last read of this product; a mismatch rejects the update
    pub concurrency_stamp: Uuid,
}

/// Query filters for listing products
#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
pub struct ProductFilter {
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,
    /// Page size, at least 1
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1))]
    pub page_size: u64,
    /// Case-insensitive substring match on name
    pub keyword: Option<String>,
    /// Case-insensitive exact match on category
    pub category: Option<String>,
    /// Include soft-deleted products in the result
    #[serde(default)]
    pub include_deleted: bool,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            keyword: None,
            category: None,
            include_deleted: false,
        }
    }
}

impl ProductFilter {
    /// Whether a product falls inside this filter's scope. Filters compose
    /// with logical AND; empty keyword/category strings are no filters.
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_deleted && product.is_deleted() {
            return false;
        }
        if let Some(keyword) = self.keyword.as_deref() {
            if !keyword.is_empty()
                && !product
                    .name()
                    .to_lowercase()
                    .contains(&keyword.to_lowercase())
            {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref() {
            if !category.is_empty()
                && product.category().to_lowercase() != category.to_lowercase()
            {
                return false;
            }
        }
        true
    }

    /// Number of matching products to skip before the requested page.
    /// Saturates so an absurd page number yields an empty page rather
    /// than an overflow.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

/// One page of matching products plus the pre-pagination match count
#[derive(Debug, Clone)]
pub struct ProductListing {
    pub items: Vec<Product>,
    /// Count of matching products before pagination
    pub total_count: u64,
}

/// Response envelope for the listing endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPage {
    pub items: Vec<ProductDto>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_starts_live_with_a_stamp() {
        let product = Product::new("Laptop", "Electronics", 99_999).unwrap();

        assert!(!product.is_deleted());
        assert!(!product.id().is_nil());
        assert!(!product.concurrency_stamp().is_nil());
        assert_eq!(product.name(), "Laptop");
        assert_eq!(product.category(), "Electronics");
        assert_eq!(product.price(), 99_999);
    }

    #[test]
    fn new_rejects_non_positive_price() {
        assert!(matches!(
            Product::new("Laptop", "Electronics", 0),
            Err(ProductError::Validation(_))
        ));
        assert!(matches!(
            Product::new("Laptop", "Electronics", -100),
            Err(ProductError::Validation(_))
        ));
    }

    #[test]
    fn new_rejects_empty_or_overlong_name() {
        assert!(Product::new("", "Electronics", 100).is_err());
        assert!(Product::new("   ", "Electronics", 100).is_err());
        assert!(Product::new(&"x".repeat(NAME_MAX_LEN + 1), "Electronics", 100).is_err());
        assert!(Product::new(&"x".repeat(NAME_MAX_LEN), "Electronics", 100).is_ok());
    }

    #[test]
    fn new_rejects_empty_or_overlong_category() {
        assert!(Product::new("Laptop", "", 100).is_err());
        assert!(Product::new("Laptop", &"x".repeat(CATEGORY_MAX_LEN + 1), 100).is_err());
        assert!(Product::new("Laptop", &"x".repeat(CATEGORY_MAX_LEN), 100).is_ok());
    }

    #[test]
    fn set_price_enforces_invariant() {
        let mut product = Product::new("Laptop", "Electronics", 100).unwrap();

        assert!(matches!(
            product.set_price(0),
            Err(ProductError::Validation(_))
        ));
        assert_eq!(product.price(), 100);

        product.set_price(250).unwrap();
        assert_eq!(product.price(), 250);
    }

    #[test]
    fn mark_deleted_is_idempotent() {
        let mut product = Product::new("Laptop", "Electronics", 100).unwrap();

        product.mark_deleted();
        assert!(product.is_deleted());
        product.mark_deleted();
        assert!(product.is_deleted());
    }

    #[test]
    fn stamp_rotates_only_on_matching_expectation() {
        let mut product = Product::new("Laptop", "Electronics", 100).unwrap();
        let original = product.concurrency_stamp();

        product.check_and_rotate_stamp(original).unwrap();
        assert_ne!(product.concurrency_stamp(), original);
    }

    #[test]
    fn stamp_mismatch_leaves_stamp_untouched() {
        let mut product = Product::new("Laptop", "Electronics", 100).unwrap();
        let original = product.concurrency_stamp();

        let result = product.check_and_rotate_stamp(Uuid::new_v4());
        assert!(matches!(result, Err(ProductError::Concurrency(_))));
        assert_eq!(product.concurrency_stamp(), original);
    }

    #[test]
    fn filter_matches_keyword_case_insensitively() {
        let product = Product::new("Apple", "Food", 100).unwrap();
        let filter = ProductFilter {
            keyword: Some("APP".to_string()),
            ..Default::default()
        };

        assert!(filter.matches(&product));

        let miss = ProductFilter {
            keyword: Some("pear".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&product));
    }

    #[test]
    fn filter_matches_category_exactly_ignoring_case() {
        let product = Product::new("Apple", "Food", 100).unwrap();

        let exact = ProductFilter {
            category: Some("food".to_string()),
            ..Default::default()
        };
        assert!(exact.matches(&product));

        let partial = ProductFilter {
            category: Some("foo".to_string()),
            ..Default::default()
        };
        assert!(!partial.matches(&product));
    }

    #[test]
    fn filter_excludes_deleted_by_default() {
        let mut product = Product::new("Apple", "Food", 100).unwrap();
        product.mark_deleted();

        assert!(!ProductFilter::default().matches(&product));

        let with_deleted = ProductFilter {
            include_deleted: true,
            ..Default::default()
        };
        assert!(with_deleted.matches(&product));
    }

    #[test]
    fn filter_offset_skips_previous_pages() {
        let filter = ProductFilter {
            page: 3,
            page_size: 5,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 10);
    }

    #[test]
    fn filter_offset_saturates_instead_of_overflowing() {
        let filter = ProductFilter {
            page: u64::MAX,
            page_size: 2,
            ..Default::default()
        };
        assert_eq!(filter.offset(), u64::MAX);

        let huge_both = ProductFilter {
            page: u64::MAX,
            page_size: u64::MAX,
            ..Default::default()
        };
        assert_eq!(huge_both.offset(), u64::MAX);
    }
}
