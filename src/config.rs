//! Service configuration from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `API_KEY` | required |
//! | `BIND_ADDR` | `0.0.0.0:9000` |
//! | `OPENAI_API_KEY`, `MISTRALAI_API_KEY` | unset |
//! | `OPENAI_BASE_URL`, `MISTRAL_BASE_URL` | public endpoints |
//! | `LLM_TIMEOUT_SECS` | 120 |
//! | `MAX_ITERATIONS` | 10 |
//! | `SCHEMA_SAMPLE_SIZE` | 1000 |
//! | `QUERY_TIMEOUT_SECS` | 30 |
//! | `MONGO_CLIENT_CACHE_SIZE` | 16 |

use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use pipeline_agentic::{LlmSettings, DEFAULT_MAX_ITERATIONS};

use crate::database::MongoSettings;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bearer secret for `/analyze_db`
    pub api_key: String,
    pub bind_addr: String,
    pub llm: LlmSettings,
    pub mongo: MongoSettings,
    pub max_iterations: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(api_key) = get("API_KEY") else {
            bail!("API_KEY must be set");
        };

        let defaults = LlmSettings::default();
        let llm = LlmSettings {
            openai_api_key: get("OPENAI_API_KEY"),
            mistral_api_key: get("MISTRALAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            mistral_base_url: get("MISTRAL_BASE_URL").unwrap_or(defaults.mistral_base_url),
            timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", defaults.timeout.as_secs())?),
        };

        let mongo_defaults = MongoSettings::default();
        let mongo = MongoSettings {
            schema_sample_size: parse_or(&get, "SCHEMA_SAMPLE_SIZE", mongo_defaults.schema_sample_size)?,
            query_timeout: Duration::from_secs(parse_or(
                &get,
                "QUERY_TIMEOUT_SECS",
                mongo_defaults.query_timeout.as_secs(),
            )?),
            client_cache_size: parse_or(&get, "MONGO_CLIENT_CACHE_SIZE", mongo_defaults.client_cache_size)?,
        };
        if mongo.client_cache_size == 0 {
            bail!("MONGO_CLIENT_CACHE_SIZE must be at least 1");
        }

        let max_iterations = parse_or(&get, "MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            bail!("MAX_ITERATIONS must be at least 1");
        }

        Ok(Self {
            api_key,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            llm,
            mongo,
            max_iterations,
        })
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("API_KEY", "secret")]).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.llm.timeout, Duration::from_secs(120));
        assert_eq!(config.llm.openai_base_url, "https://api.openai.com/v1");
        assert!(config.llm.openai_api_key.is_none());
        assert_eq!(config.mongo.schema_sample_size, 1000);
        assert_eq!(config.mongo.query_timeout, Duration::from_secs(30));
        assert_eq!(config.mongo.client_cache_size, 16);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("API_KEY", "secret"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("MISTRALAI_API_KEY", "mk"),
            ("MAX_ITERATIONS", "3"),
            ("SCHEMA_SAMPLE_SIZE", "250"),
            ("QUERY_TIMEOUT_SECS", "5"),
            ("MONGO_CLIENT_CACHE_SIZE", "4"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.llm.mistral_api_key.as_deref(), Some("mk"));
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.mongo.schema_sample_size, 250);
        assert_eq!(config.mongo.query_timeout, Duration::from_secs(5));
        assert_eq!(config.mongo.client_cache_size, 4);
    }

    #[test]
    fn test_client_cache_size_must_be_positive() {
        let err = config(&[("API_KEY", "secret"), ("MONGO_CLIENT_CACHE_SIZE", "0")]).unwrap_err();
        assert_eq!(err.to_string(), "MONGO_CLIENT_CACHE_SIZE must be at least 1");
    }

    #[test]
    fn test_api_key_required() {
        let err = config(&[("API_KEY", "  ")]).unwrap_err();
        assert_eq!(err.to_string(), "API_KEY must be set");
    }

    #[test]
    fn test_invalid_number() {
        let err = config(&[("API_KEY", "k"), ("MAX_ITERATIONS", "ten")]).unwrap_err();
        assert_eq!(err.to_string(), "MAX_ITERATIONS has invalid value 'ten'");
        assert!(config(&[("API_KEY", "k"), ("MAX_ITERATIONS", "0")]).is_err());
    }
}
