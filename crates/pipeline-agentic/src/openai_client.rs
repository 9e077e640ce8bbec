//! OpenAI Client
//!
//! LLM client implementation for the OpenAI chat completions API.

use async_trait::async_trait;

use crate::backend::OPENAI_GPT4_MODEL;
use crate::completions;
use crate::error::GenerationError;
use crate::llm_client::{ChatMessage, LlmClient, ToolCallResult, ToolDefinition};

/// Public OpenAI API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "OpenAI";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client for the default model
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self::with_model(api_key, client, OPENAI_GPT4_MODEL)
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

    /// Point the client at another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, GenerationError> {
        if let Some(last) = messages.last() {
            tracing::debug!("OpenAI chat, last turn: {}", last.content);
        }
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
            tracing::debug!("OpenAI {} call, last turn: {}", tool.name, last.content);
        }
        // "required" forces a tool call; with a single declared tool it must be this one
        let body =
            completions::request_body(&self.model, messages, temperature, Some((tool, "required")));
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
