//! LLM-powered aggregation pipeline agent
//!
//! This crate turns a natural-language question into a MongoDB aggregation
//! pipeline, has the model critique its own proposal, executes it through a
//! [`DatabaseGateway`] and asks the model for a final answer. It has no
//! database driver dependencies - the MongoDB gateway lives in the server crate.
//!
//! ## Architecture
//!
//! ```text
//! Query → Schema summary → GENERATING → REVIEWING → EXECUTING → SUMMARIZING
//!                              ↑            │            │
//!                              └── feedback ┴── error ───┘
//! ```
//!
//! ## Backend Selection
//!
//! The backend is chosen per request from the model identifier:
//! - `gpt-4-turbo-2024-04-09`: OpenAI chat completions
//! - `codestral-latest`: Mistral chat completions

// LLM client abstraction
pub mod backend;
pub mod client_factory;
pub mod completions;
pub mod llm_client;
pub mod mistral_client;
pub mod openai_client;

// Core agent modules
pub mod conversation;
pub mod database;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod proposal;
pub mod review_loop;
pub mod tools;

// Re-exports for convenience
pub use backend::ModelBackend;
pub use client_factory::{LlmClientFactory, LlmSettings};
pub use conversation::Conversation;
pub use database::DatabaseGateway;
pub use error::{AgentError, ConfigError, GenerationError, QueryExecutionError};
pub use llm_client::{ChatMessage, ChatRole, LlmClient, ToolCallResult, ToolDefinition};
pub use pipeline::{Pipeline, PipelineValue};
pub use proposal::{PipelineProposal, ProposalError, ReviewVerdict};
pub use review_loop::{
    AgentAnswer, AnswerKind, QueryRequest, ReviewLoop, DEFAULT_EXAMPLE_COUNT, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_OUTPUT_COUNT,
};
