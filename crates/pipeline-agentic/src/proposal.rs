//! Structured tool outputs: pipeline proposals and review verdicts.
//!
//! Both are decoded explicitly from the tool-call arguments. A payload that
//! does not match the declared schema is a `GenerationError`; a proposal whose
//! pipeline text is unusable is reported separately so the loop can ask the
//! model to fix it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::GenerationError;
use crate::pipeline::{Pipeline, PipelineError};
use crate::tools::{EXECUTION_TOOL, REVIEW_TOOL};

/// Why a generation tool call could not become a proposal
#[derive(Debug, Error)]
pub enum ProposalError {
    /// Arguments do not match the execution tool schema
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Schema matched but the pipeline text is not a usable pipeline
    #[error("{source}")]
    Pipeline {
        collection_name: String,
        raw_pipeline: String,
        #[source]
        source: PipelineError,
    },
}

#[derive(Debug, Deserialize)]
struct RawProposal {
    collection_name: String,
    #[serde(default)]
    pipeline: Option<Value>,
    #[serde(default)]
    analysis_failed: bool,
}

/// A pipeline the model wants to run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineProposal {
    pub collection_name: String,
    /// `None` when the model supplied no pipeline
    pub pipeline: Option<Pipeline>,
    /// Model judged the query unrelated to the collections
    pub analysis_failed: bool,
}

impl PipelineProposal {
    /// Decode execution-tool arguments
    ///
    /// With `allow_off_topic == false` the model's `analysis_failed` flag is
    /// ignored; only the first generation of a session may declare a query
    /// off-topic. Dates in the pipeline are coerced once here.
    pub fn from_tool_arguments(
        arguments: Value,
        allow_off_topic: bool,
    ) -> Result<Self, ProposalError> {
        let raw: RawProposal =
            serde_json::from_value(arguments).map_err(|e| GenerationError::MalformedArguments {
                tool: EXECUTION_TOOL.to_string(),
                reason: e.to_string(),
            })?;

        let analysis_failed = allow_off_topic && raw.analysis_failed;
        if analysis_failed {
            return Ok(Self {
                collection_name: raw.collection_name,
                pipeline: None,
                analysis_failed,
            });
        }

        let parsed = match raw.pipeline {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(Value::String(text)) => Some(Pipeline::parse(&text).map_err(|source| {
                ProposalError::Pipeline {
                    collection_name: raw.collection_name.clone(),
                    raw_pipeline: text.clone(),
                    source,
                }
            })?),
            Some(structured) => {
                let raw_pipeline = structured.to_string();
                Some(Pipeline::from_json(structured).map_err(|source| {
                    ProposalError::Pipeline {
                        collection_name: raw.collection_name.clone(),
                        raw_pipeline,
                        source,
                    }
                })?)
            }
        };

        Ok(Self {
            collection_name: raw.collection_name,
            pipeline: parsed.map(Pipeline::with_coerced_dates),
            analysis_failed,
        })
    }

    /// Pipeline as prompt text; `null` when absent
    pub fn pipeline_text(&self) -> String {
        self.pipeline
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "null".to_string())
    }
}

/// The model's critique of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    pub incorrect: bool,
    pub incorrect_reason: String,
    pub is_intermediate: bool,
    pub intermediate_reason: String,
    pub has_dml: bool,
    pub dml_reason: String,
    pub has_raw_output: bool,
    pub raw_output_reason: String,
}

impl ReviewVerdict {
    pub fn from_tool_arguments(arguments: Value) -> Result<Self, GenerationError> {
        serde_json::from_value(arguments).map_err(|e| GenerationError::MalformedArguments {
            tool: REVIEW_TOOL.to_string(),
            reason: e.to_string(),
        })
    }

    /// All four flags are false
    pub fn is_clean(&self) -> bool {
        !(self.incorrect || self.is_intermediate || self.has_dml || self.has_raw_output)
    }

    /// Names of the raised flags, for logging
    pub fn raised_flags(&self) -> Vec<&'static str> {
        [
            (self.is_intermediate, "intermediate"),
            (self.has_raw_output, "raw_output"),
            (self.has_dml, "dml"),
            (self.incorrect, "incorrect"),
        ]
        .into_iter()
        .filter_map(|(raised, name)| raised.then_some(name))
        .collect()
    }
}
