//! Error types for the pipeline agent.
//!
//! - `GenerationError`: the model backend failed or returned an unusable tool call.
//!   Never retried by the clients; propagates out of the loop.
//! - `QueryExecutionError`: the database rejected a pipeline. Carries the backend's
//!   own error text so it can be fed back to the model verbatim.
//! - `ConfigError`: request-time wiring problems (unknown model, missing key).
//! - `AgentError`: everything the review loop can fail with.

use thiserror::Error;

/// Model backend failure.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {provider} response: {reason}")]
    MalformedResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("model did not call the `{expected}` tool")]
    NoToolCall { expected: String },

    #[error("model returned {count} tool calls, exactly one `{expected}` call was requested")]
    MultipleToolCalls { expected: String, count: usize },

    #[error("model called tool `{got}`, expected `{expected}`")]
    UnexpectedTool { expected: String, got: String },

    #[error("invalid arguments for tool `{tool}`: {reason}")]
    MalformedArguments { tool: String, reason: String },

    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// Pipeline execution failure, as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryExecutionError {
    pub message: String,
}

impl QueryExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Request-time configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown model '{0}'. Valid values: gpt-4-turbo-2024-04-09, codestral-latest")]
    UnknownModel(String),

    #[error("{backend} API key is not configured (set {env_var})")]
    MissingApiKey {
        backend: &'static str,
        env_var: &'static str,
    },

    #[error("database type '{0}' is not supported. Valid values: MongoDB")]
    UnsupportedDatabase(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure of a whole review-loop run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("schema discovery failed: {0}")]
    SchemaDiscovery(#[source] QueryExecutionError),

    #[error("no executable pipeline after {iterations} attempts")]
    IterationLimit {
        iterations: u32,
        last_feedback: Option<String>,
    },
}
