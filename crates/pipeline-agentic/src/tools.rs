//! Tool schemas offered to the model
//!
//! The loop forces one of these per call so replies come back as structured
//! arguments rather than prose.

use serde_json::json;

use crate::llm_client::ToolDefinition;

/// Name of the tool carrying a pipeline proposal
pub const EXECUTION_TOOL: &str = "run_aggregation_pipeline";

/// Name of the tool carrying a review verdict
pub const REVIEW_TOOL: &str = "review_aggregation_pipeline";

/// Tool the model calls to propose a pipeline
pub fn execution_tool() -> ToolDefinition {
    ToolDefinition {
        name: EXECUTION_TOOL.to_string(),
        description: "Runs the given MongoDB aggregation pipeline on a collection and \
                      returns the resulting documents, or the database error if the \
                      pipeline is wrong."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "collection_name": {
                    "type": "string",
                    "description": "The MongoDB collection the pipeline runs against. \
                                    Nothing runs without it."
                },
                "pipeline": {
                    "type": "string",
                    "description": "JSON array of aggregation stages passed to the \
                                    aggregate command of the collection."
                },
                "analysis_failed": {
                    "type": "boolean",
                    "description": "True if the question has nothing to do with querying \
                                    the database, otherwise false. A correction from the \
                                    user is never irrelevant."
                }
            },
            "required": ["collection_name", "pipeline", "analysis_failed"]
        }),
    }
}

/// Tool the model calls to critique its own proposal
pub fn review_tool() -> ToolDefinition {
    ToolDefinition {
        name: REVIEW_TOOL.to_string(),
        description: "Checks a generated aggregation pipeline against the conditions \
                      below before it runs. Every parameter is required."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "incorrect": {
                    "type": "boolean",
                    "description": "True if the pipeline has syntactic, logical or other \
                                    errors when run through the aggregate command."
                },
                "incorrect_reason": {
                    "type": "string",
                    "description": "Why incorrect is true or false, with the corrections \
                                    needed."
                },
                "is_intermediate": {
                    "type": "boolean",
                    "description": "True if the pipeline cannot fetch the data the \
                                    question asks for, or is empty. A pipeline that joins \
                                    several collections in one step is not intermediate."
                },
                "intermediate_reason": {
                    "type": "string",
                    "description": "Why is_intermediate is true or false."
                },
                "has_dml": {
                    "type": "boolean",
                    "description": "True if the pipeline inserts, updates, modifies or \
                                    deletes data."
                },
                "dml_reason": {
                    "type": "string",
                    "description": "Why has_dml is true or false."
                },
                "has_raw_output": {
                    "type": "boolean",
                    "description": "True if the result would be raw data hard for a user \
                                    to read, such as bare object ids."
                },
                "raw_output_reason": {
                    "type": "string",
                    "description": "Why has_raw_output is true or false."
                }
            },
            "required": [
                "incorrect",
                "incorrect_reason",
                "is_intermediate",
                "intermediate_reason",
                "has_dml",
                "dml_reason",
                "has_raw_output",
                "raw_output_reason"
            ]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_tool_requires_all_fields() {
        let tool = execution_tool();
        assert_eq!(tool.name, EXECUTION_TOOL);
        assert_eq!(
            tool.parameters["required"],
            json!(["collection_name", "pipeline", "analysis_failed"])
        );
    }

    #[test]
    fn test_review_tool_pairs_flags_with_reasons() {
        let tool = review_tool();
        let props = tool.parameters["properties"].as_object().unwrap();
        for flag in ["incorrect", "is_intermediate", "has_dml", "has_raw_output"] {
            assert_eq!(props[flag]["type"], "boolean");
        }
        assert_eq!(tool.parameters["required"].as_array().unwrap().len(), 8);
    }
}
