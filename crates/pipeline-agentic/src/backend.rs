//! Backend Selection
//!
//! Maps the request's model identifier onto a chat-completion provider.

use std::str::FromStr;

use crate::error::ConfigError;

/// OpenAI model accepted by the agent
pub const OPENAI_GPT4_MODEL: &str = "gpt-4-turbo-2024-04-09";

/// Mistral model accepted by the agent
pub const MISTRAL_CODE_MODEL: &str = "codestral-latest";

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelBackend {
    /// OpenAI chat completions (default)
    #[default]
    OpenAi,
    /// Mistral chat completions
    Mistral,
}

impl ModelBackend {
    /// Resolve the backend serving `model`
    pub fn for_model(model: &str) -> Result<Self, ConfigError> {
        model.parse()
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            ModelBackend::OpenAi => "OpenAI",
            ModelBackend::Mistral => "Mistral",
        }
    }

    /// Environment variable holding this backend's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ModelBackend::OpenAi => "OPENAI_API_KEY",
            ModelBackend::Mistral => "MISTRALAI_API_KEY",
        }
    }
}

impl FromStr for ModelBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            OPENAI_GPT4_MODEL => Ok(ModelBackend::OpenAi),
            MISTRAL_CODE_MODEL => Ok(ModelBackend::Mistral),
            other => Err(ConfigError::UnknownModel(other.to_string())),
        }
    }
}

impl std::fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_model_id() {
        assert_eq!(
            ModelBackend::for_model("gpt-4-turbo-2024-04-09").unwrap(),
            ModelBackend::OpenAi
        );
        assert_eq!(
            ModelBackend::for_model("codestral-latest").unwrap(),
            ModelBackend::Mistral
        );
        assert_eq!(
            ModelBackend::for_model("gpt-3.5-turbo"),
            Err(ConfigError::UnknownModel("gpt-3.5-turbo".to_string()))
        );
    }

    #[test]
    fn test_default() {
        assert_eq!(ModelBackend::default(), ModelBackend::OpenAi);
    }
}
