//! Request and response bodies of the HTTP API.

use pipeline_agentic::backend::OPENAI_GPT4_MODEL;
use pipeline_agentic::{prompts, QueryRequest, DEFAULT_EXAMPLE_COUNT, DEFAULT_MAX_OUTPUT_COUNT};
use serde::{Deserialize, Serialize};

use crate::database::MONGODB;

/// Body of `POST /analyze_db`
#[derive(Debug, Clone, Deserialize)]
pub struct QueryInput {
    pub connection_url: String,
    pub database_name: String,
    pub collection_list: Vec<String>,
    pub query: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_example_count")]
    pub example_count: usize,
    #[serde(default = "default_max_output_count")]
    pub max_output_count: usize,
    #[serde(default = "default_database_type")]
    pub database_type: String,
    #[serde(default = "default_llm_name")]
    pub llm_name: String,
    #[serde(default)]
    pub temperature: f32,
}

fn default_description() -> String {
    prompts::default_description().to_string()
}

fn default_example_count() -> usize {
    DEFAULT_EXAMPLE_COUNT
}

fn default_max_output_count() -> usize {
    DEFAULT_MAX_OUTPUT_COUNT
}

fn default_database_type() -> String {
    MONGODB.to_string()
}

fn default_llm_name() -> String {
    OPENAI_GPT4_MODEL.to_string()
}

impl QueryInput {
    /// Loop input for this body; connection details are consumed elsewhere
    pub fn to_query_request(&self, max_iterations: u32) -> QueryRequest {
        QueryRequest {
            collections: self.collection_list.clone(),
            query: self.query.clone(),
            description: self.description.clone(),
            temperature: self.temperature,
            max_output_count: self.max_output_count,
            example_count: self.example_count,
            max_iterations,
        }
    }
}

/// Every response, success or failure, has this shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub output: Option<String>,
    /// Error category
    pub error: Option<String>,
    /// Error detail: a message or a structured object
    pub error_data: Option<serde_json::Value>,
}

impl TaskResponse {
    pub fn output(output: String) -> Self {
        Self {
            output: Some(output),
            ..Default::default()
        }
    }

    pub fn error(category: &str, data: serde_json::Value) -> Self {
        Self {
            output: None,
            error: Some(category.to_string()),
            error_data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let input: QueryInput = serde_json::from_value(json!({
            "connection_url": "mongodb://localhost:27017",
            "database_name": "app",
            "collection_list": ["Users"],
            "query": "How many users are there?"
        }))
        .unwrap();

        assert_eq!(input.example_count, 10);
        assert_eq!(input.max_output_count, 30);
        assert_eq!(input.database_type, "MongoDB");
        assert_eq!(input.llm_name, "gpt-4-turbo-2024-04-09");
        assert_eq!(input.temperature, 0.0);
        assert!(input.description.contains("$expr"));

        let request = input.to_query_request(4);
        assert_eq!(request.collections, vec!["Users"]);
        assert_eq!(request.max_iterations, 4);
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(TaskResponse::output("3 users".into())).unwrap();
        assert_eq!(json, json!({"output": "3 users", "error": null, "error_data": null}));
    }
}
