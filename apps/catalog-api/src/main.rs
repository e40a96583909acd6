//! Catalog API - REST server for the product catalog

use axum::Router;
use axum_helpers::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_products::{
    handlers, ApiDoc, InMemoryProductRepository, MongoProductRepository, ProductRepository,
    ProductService,
};
use tracing::info;

mod config;
mod seed;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.environment);

    let products_routes = match &config.mongodb {
        Some(mongo) => {
            info!("Connecting to MongoDB at {}", mongo.uri);
            let client = mongodb::Client::with_uri_str(&mongo.uri).await?;
            let db = client.database(&mongo.database);

            let repository = MongoProductRepository::new(&db);
            repository.init_indexes().await?;
            info!("Connected to MongoDB database: {}", mongo.database);

            build_routes(repository, &config).await?
        }
        None => {
            info!("MONGO_URI not set, using in-memory repository");
            build_routes(InMemoryProductRepository::new(), &config).await?
        }
    };

    // Create a router with OpenAPI docs and merge health endpoints
    let router = create_router::<ApiDoc>(Router::new().nest("/products", products_routes)).await?;
    let app = router.merge(health_router(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    ));

    info!("Starting Catalog API on port {}", config.server.port);

    // Run server with graceful shutdown
    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}

async fn build_routes<R: ProductRepository + 'static>(
    repository: R,
    config: &Config,
) -> eyre::Result<Router> {
    let service = ProductService::new(repository);

    if config.seed_demo_data {
        seed::seed_demo_products(&service).await?;
    }

    Ok(handlers::router(service))
}
