//! Client Factory
//!
//! Builds an `LlmClient` for the model a request names. One shared
//! `reqwest::Client` backs every client the factory hands out.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::ModelBackend;
use crate::error::ConfigError;
use crate::llm_client::LlmClient;
use crate::mistral_client::{self, MistralClient};
use crate::openai_client::{self, OpenAiClient};

/// API keys and endpoints for both backends
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub openai_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub openai_base_url: String,
    pub mistral_base_url: String,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            mistral_api_key: None,
            openai_base_url: openai_client::DEFAULT_BASE_URL.to_string(),
            mistral_base_url: mistral_client::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Hands out per-request LLM clients
#[derive(Clone)]
pub struct LlmClientFactory {
    settings: LlmSettings,
    http: reqwest::Client,
}

impl LlmClientFactory {
    pub fn new(settings: LlmSettings) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { settings, http })
    }

    /// Create the client serving `model`
    ///
    /// Unknown model identifiers and missing API keys are configuration
    /// errors, reported before any network call.
    pub fn create(&self, model: &str) -> Result<Arc<dyn LlmClient>, ConfigError> {
        let backend = ModelBackend::for_model(model)?;
        let missing = || ConfigError::MissingApiKey {
            backend: backend.name(),
            env_var: backend.api_key_var(),
        };

        let client: Arc<dyn LlmClient> = match backend {
            ModelBackend::OpenAi => {
                let key = self.settings.openai_api_key.clone().ok_or_else(missing)?;
                Arc::new(
                    OpenAiClient::with_model(key, self.http.clone(), model)
                        .with_base_url(&self.settings.openai_base_url),
                )
            }
            ModelBackend::Mistral => {
                let key = self.settings.mistral_api_key.clone().ok_or_else(missing)?;
                Arc::new(
                    MistralClient::with_model(key, self.http.clone(), model)
                        .with_base_url(&self.settings.mistral_base_url),
                )
            }
        };

        tracing::debug!(
            "Created {} client for model {}",
            client.provider_name(),
            client.model_name()
        );
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(openai: Option<&str>, mistral: Option<&str>) -> LlmClientFactory {
        LlmClientFactory::new(LlmSettings {
            openai_api_key: openai.map(str::to_string),
            mistral_api_key: mistral.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_selects_backend_by_model() {
        let factory = factory(Some("sk-openai"), Some("sk-mistral"));

        let openai = factory.create("gpt-4-turbo-2024-04-09").unwrap();
        assert_eq!(openai.provider_name(), "OpenAI");

        let mistral = factory.create("codestral-latest").unwrap();
        assert_eq!(mistral.provider_name(), "Mistral");
        assert_eq!(mistral.model_name(), "codestral-latest");
    }

    #[test]
    fn test_unknown_model_is_config_error() {
        let err = factory(Some("k"), Some("k")).create("llama-3").err().unwrap();
        assert_eq!(err, ConfigError::UnknownModel("llama-3".to_string()));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = factory(Some("k"), None).create("codestral-latest").err().unwrap();
        assert_eq!(
            err,
            ConfigError::MissingApiKey {
                backend: "Mistral",
                env_var: "MISTRALAI_API_KEY"
            }
        );
    }
}
