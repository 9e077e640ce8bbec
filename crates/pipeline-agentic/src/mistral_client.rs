//! Mistral Client
//!
//! LLM client implementation for the Mistral chat completions API.

use async_trait::async_trait;

use crate::backend::MISTRAL_CODE_MODEL;
use crate::completions;
use crate::error::GenerationError;
use crate::llm_client::{ChatMessage, LlmClient, ToolCallResult, ToolDefinition};

/// Public Mistral API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

const PROVIDER: &str = "Mistral";

/// Mistral API client
#[derive(Clone)]
pub struct MistralClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl MistralClient {
    /// Create a new Mistral client for the default model
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self::with_model(api_key, client, MISTRAL_CODE_MODEL)
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, client: reqwest::Client, model: &str) -> Self {
        Self {
            api_key,
            client,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GenerationError> {
        let body = completions::request_body(&self.model, messages, temperature, None);
        let response =
            completions::send(&self.client, PROVIDER, &self.endpoint(), &self.api_key, &body)
                .await?;
        completions::into_text(PROVIDER, response)
    }

    async fn chat_with_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolDefinition,
        temperature: f32,
    ) -> Result<ToolCallResult, GenerationError> {
        if let Some(last) = messages.last() {
            tracing::debug!("Mistral {} call, last turn: {}", tool.name, last.content);
        }
        // Mistral spells "must call a tool" as "any"
        let body =
            completions::request_body(&self.model, messages, temperature, Some((tool, "any")));
        let response =
            completions::send(&self.client, PROVIDER, &self.endpoint(), &self.api_key, &body)
                .await?;
        completions::into_tool_call(PROVIDER, response, tool)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client() {
        let client = MistralClient::new("test-key".to_string(), reqwest::Client::new());
        assert_eq!(client.model_name(), MISTRAL_CODE_MODEL);
        assert_eq!(client.provider_name(), "Mistral");
        assert_eq!(client.endpoint(), "https://api.mistral.ai/v1/chat/completions");
    }
}
