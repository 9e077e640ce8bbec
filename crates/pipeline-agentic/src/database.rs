//! Database gateway seam
//!
//! The review loop only needs two things from a database: run a pipeline and
//! describe the collections it may touch. Implementations live outside this
//! crate (the MongoDB one is in the server crate; tests script their own).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QueryExecutionError;
use crate::pipeline::Pipeline;

#[async_trait]
pub trait DatabaseGateway: Send + Sync {
    /// Run `pipeline` on `collection`, pulling at most `fetch_limit` documents
    ///
    /// Documents come back as relaxed Extended JSON. Errors carry the
    /// backend's own message text.
    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
        fetch_limit: usize,
    ) -> Result<Vec<Value>, QueryExecutionError>;

    /// Rendered schema summary of `collections` for the system prompt
    async fn summarize_schema(
        &self,
        collections: &[String],
        sample_count: usize,
    ) -> Result<String, QueryExecutionError>;
}
