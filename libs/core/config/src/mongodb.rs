use crate::{env_or_default, env_required, ConfigError, FromEnv};

/// MongoDB configuration
#[derive(Clone, Debug)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl MongoConfig {
    pub fn new(uri: String, database: String) -> Self {
        Self { uri, database }
    }
}

impl FromEnv for MongoConfig {
    /// Requires MONGO_URI to be set; MONGO_DATABASE defaults to "catalog"
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            uri: env_required("MONGO_URI")?,
            database: env_or_default("MONGO_DATABASE", "catalog"),
        })
    }
}
