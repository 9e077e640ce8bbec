//! Natural-language questions over MongoDB, answered by an LLM review loop.
//!
//! The loop itself (prompting, review, retries) lives in the
//! `pipeline-agentic` crate. This crate adds the MongoDB gateway, service
//! configuration and the HTTP API.

pub mod config;
pub mod database;

#[cfg(feature = "server")]
pub mod api;

pub use pipeline_agentic as agentic;
