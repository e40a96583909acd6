//! Demo data seeding for empty catalogs.

use domain_products::{
    CreateProductRequest, ProductError, ProductFilter, ProductRepository, ProductService,
};
use tracing::info;

/// Demo products (name, category, price in cents)
const DEMO_PRODUCTS: [(&str, &str, i64); 10] = [
    ("Laptop", "Electronics", 99_999),
    ("Mouse", "Electronics", 2_999),
    ("Keyboard", "Electronics", 7_999),
    ("Monitor", "Electronics", 29_999),
    ("Desk Chair", "Furniture", 19_999),
    ("Standing Desk", "Furniture", 44_999),
    ("Notebook", "Stationery", 499),
    ("Pen Set", "Stationery", 1_299),
    ("Coffee Mug", "Kitchen", 1_499),
    ("Water Bottle", "Kitchen", 1_999),
];

/// Seed demo products when the catalog is empty. Idempotent: a non-empty
/// catalog (deleted products included) is left untouched.
pub async fn seed_demo_products<R: ProductRepository>(
    service: &ProductService<R>,
) -> Result<(), ProductError> {
    let existing = service
        .list_products(ProductFilter {
            include_deleted: true,
            ..Default::default()
        })
        .await?;

    if existing.total_count > 0 {
        info!(
            total = existing.total_count,
            "Catalog already has products, skipping demo seed"
        );
        return Ok(());
    }

    for (name, category, price) in DEMO_PRODUCTS {
        service
            .create_product(CreateProductRequest {
                name: name.to_string(),
                category: category.to_string(),
                price,
            })
            .await?;
    }

    info!(count = DEMO_PRODUCTS.len(), "Seeded demo products");
    Ok(())
}
