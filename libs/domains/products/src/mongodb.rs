//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use mongodb::{
    bson::{doc, to_bson, Bson},
    error::{ErrorKind, WriteFailure},
    options::{Collation, CollationStrength, IndexOptions},
    Collection, Database, IndexModel,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductFilter, ProductListing};
use crate::repository::ProductRepository;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB implementation of the ProductRepository
pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    /// Create a new MongoProductRepository
    pub fn new(db: &Database) -> Self {
        let collection = db.collection::<Product>("products");
        Self { collection }
    }

    /// Create a new MongoProductRepository with a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Product>(collection_name);
        Self { collection }
    }

    /// Initialize indexes for optimal query performance
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            // Case-insensitive unique name among live products. The partial
            // filter keeps deleted products from blocking name reuse.
            IndexModel::builder()
                .keys(doc! { "name": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .collation(
                            Collation::builder()
                                .locale("en")
                                .strength(CollationStrength::Secondary)
                                .build(),
                        )
                        .partial_filter_expression(doc! { "is_deleted": false })
                        .name("idx_name_unique_live".to_string())
                        .build(),
                )
                .build(),
            // Listing order
            IndexModel::builder()
                .keys(doc! { "created_at": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_created_at".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Product> {
        &self.collection
    }

    /// Build a MongoDB filter document from ProductFilter
    fn build_filter(filter: &ProductFilter) -> mongodb::bson::Document {
        let mut doc = doc! {};

        if !filter.include_deleted {
            doc.insert("is_deleted", false);
        }

        if let Some(keyword) = filter.keyword.as_deref() {
            if !keyword.is_empty() {
                doc.insert(
                    "name",
                    doc! { "$regex": regex::escape(keyword), "$options": "i" },
                );
            }
        }

        if let Some(category) = filter.category.as_deref() {
            if !category.is_empty() {
                doc.insert(
                    "category",
                    doc! { "$regex": format!("^{}$", regex::escape(category)), "$options": "i" },
                );
            }
        }

        doc
    }

    fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
        matches!(
            *err.kind,
            ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY_CODE
        )
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, product), fields(product_name = %product.name()))]
    async fn insert(&self, product: Product) -> ProductResult<Product> {
        if let Err(err) = self.collection.insert_one(&product).await {
            if Self::is_duplicate_key(&err) {
                return Err(ProductError::DuplicateName(product.name().to_string()));
            }
            return Err(err.into());
        }

        tracing::info!(product_id = %product.id(), "Product created successfully");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: Uuid, include_deleted: bool) -> ProductResult<Option<Product>> {
        let mut filter = doc! { "_id": to_bson(&id).unwrap_or(Bson::Null) };
        if !include_deleted {
            filter.insert("is_deleted", false);
        }
        let product = self.collection.find_one(filter).await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn exists_by_name(&self, name: &str) -> ProductResult<bool> {
        let filter = doc! {
            "name": { "$regex": format!("^{}$", regex::escape(name)), "$options": "i" },
            "is_deleted": false,
        };
        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: ProductFilter) -> ProductResult<ProductListing> {
        use futures_util::TryStreamExt;

        let mongo_filter = Self::build_filter(&filter);

        let total_count = self
            .collection
            .count_documents(mongo_filter.clone())
            .await?;

        // Clamp so an oversized page_size cannot wrap into a negative limit.
        let limit = i64::try_from(filter.page_size).unwrap_or(i64::MAX);
        let options = mongodb::options::FindOptions::builder()
            .skip(filter.offset())
            .limit(limit)
            // _id tiebreak keeps the order stable for equal timestamps
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();

        let cursor = self
            .collection
            .find(mongo_filter)
            .with_options(options)
            .await?;
        let items: Vec<Product> = cursor.try_collect().await?;

        Ok(ProductListing { items, total_count })
    }

    #[instrument(skip(self, product), fields(product_id = %product.id()))]
    async fn save(&self, product: Product, loaded_stamp: Uuid) -> ProductResult<Product> {
        // The stamp in the filter makes the compare-and-swap atomic: a
        // racing writer that already rotated the stamp leaves nothing to
        // match, and the replace becomes a no-op.
        let filter = doc! {
            "_id": to_bson(&product.id()).unwrap_or(Bson::Null),
            "concurrency_stamp": to_bson(&loaded_stamp).unwrap_or(Bson::Null),
        };

        // A rename that lost the advisory-uniqueness race still hits the
        // unique name index here; surface it as a conflict, not a 500.
        let result = match self.collection.replace_one(filter, &product).await {
            Ok(result) => result,
            Err(err) if Self::is_duplicate_key(&err) => {
                return Err(ProductError::DuplicateName(product.name().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        if result.matched_count == 0 {
            // Distinguish a lost race from a missing product.
            let by_id = doc! { "_id": to_bson(&product.id()).unwrap_or(Bson::Null) };
            return match self.collection.find_one(by_id).await? {
                Some(_) => Err(ProductError::Concurrency(product.id())),
                None => Err(ProductError::NotFound(product.id())),
            };
        }

        tracing::info!(product_id = %product.id(), "Product saved successfully");
        Ok(product)
    }
}
