//! Shared handles every request reads from.

use pipeline_agentic::{ConfigError, LlmClientFactory};

use crate::config::AppConfig;
use crate::database::{MongoRegistry, MongoSettings};

pub struct AppState {
    pub api_key: String,
    pub llm_factory: LlmClientFactory,
    pub mongo: MongoRegistry,
    pub mongo_settings: MongoSettings,
    pub max_iterations: u32,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: config.api_key.clone(),
            llm_factory: LlmClientFactory::new(config.llm.clone())?,
            mongo: MongoRegistry::with_capacity(config.mongo.client_cache_size),
            mongo_settings: config.mongo.clone(),
            max_iterations: config.max_iterations,
        })
    }
}
