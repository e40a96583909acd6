use core_config::mongodb::MongoConfig;
use core_config::server::ServerConfig;
use core_config::{env_flag, ConfigError, Environment, FromEnv};

/// Catalog API configuration, loaded from environment variables.
///
/// MongoDB is optional: without MONGO_URI the API runs on the in-memory
/// repository, which is enough for local development and demos.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: Option<MongoConfig>,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;

        let mongodb = if std::env::var("MONGO_URI").is_ok() {
            Some(MongoConfig::from_env()?)
        } else {
            None
        };

        // Demo data is seeded by default only in development.
        let seed_demo_data = env_flag("SEED_DEMO_DATA", environment.is_development());

        Ok(Self {
            environment,
            server,
            mongodb,
            seed_demo_data,
        })
    }
}
