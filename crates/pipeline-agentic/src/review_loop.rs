//! Pipeline Review Loop
//!
//! Drives one natural-language query to an answer:
//!
//! ```text
//! GENERATING ──off-topic──▶ return
//!     │
//!     ▼
//! REVIEWING ──dirty──▶ feedback ──▶ GENERATING
//!     │ clean
//!     ▼
//! EXECUTING ──error──▶ error turn ──▶ GENERATING
//!     │ rows
//!     ▼
//! SUMMARIZING ──▶ return
//! ```
//!
//! Every failed attempt counts one iteration. The loop gives up with
//! [`AgentError::IterationLimit`] once the cap is reached.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::database::DatabaseGateway;
use crate::error::{AgentError, QueryExecutionError};
use crate::llm_client::{LlmClient, ToolDefinition};
use crate::prompts;
use crate::proposal::{PipelineProposal, ProposalError, ReviewVerdict};
use crate::tools;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
pub const DEFAULT_MAX_OUTPUT_COUNT: usize = 30;
pub const DEFAULT_EXAMPLE_COUNT: usize = 10;

/// One question against an allow-listed set of collections
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub collections: Vec<String>,
    pub query: String,
    /// Free-text database description placed in the system prompt
    pub description: String,
    pub temperature: f32,
    /// Rows shown to the model; one more is fetched to detect truncation
    pub max_output_count: usize,
    /// Example values per field in the schema summary
    pub example_count: usize,
    pub max_iterations: u32,
}

impl QueryRequest {
    pub fn new(collections: Vec<String>, query: impl Into<String>) -> Self {
        Self {
            collections,
            query: query.into(),
            description: prompts::default_description().to_string(),
            temperature: 0.0,
            max_output_count: DEFAULT_MAX_OUTPUT_COUNT,
            example_count: DEFAULT_EXAMPLE_COUNT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Pipeline ran and the model summarized the rows
    Summarized,
    /// Model declared the question unrelated on its first generation
    OffTopic,
}

/// Final text plus how it was reached
#[derive(Debug, Clone)]
pub struct AgentAnswer {
    pub output: String,
    pub iterations: u32,
    pub kind: AnswerKind,
    pub conversation: Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Generating,
    Reviewing,
    Executing,
    Summarizing,
}

/// Per-run state, created once per request and dropped with it
#[derive(Debug)]
struct LoopState {
    conversation: Conversation,
    current_proposal: Option<PipelineProposal>,
    failed: bool,
    iteration_count: u32,
    last_feedback: Option<String>,
}

impl LoopState {
    fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            current_proposal: None,
            failed: false,
            iteration_count: 0,
            last_feedback: None,
        }
    }

    /// Record a failed attempt whose feedback is the turn just appended
    fn fail_with(&mut self, feedback: String) {
        self.conversation.push_user(feedback.clone());
        self.last_feedback = Some(feedback);
        self.failed = true;
    }
}

/// Generate → review → execute → summarize loop over one model and one database
pub struct ReviewLoop {
    llm: Arc<dyn LlmClient>,
    database: Arc<dyn DatabaseGateway>,
    execution_tool: ToolDefinition,
    review_tool: ToolDefinition,
}

impl ReviewLoop {
    pub fn new(llm: Arc<dyn LlmClient>, database: Arc<dyn DatabaseGateway>) -> Self {
        Self {
            llm,
            database,
            execution_tool: tools::execution_tool(),
            review_tool: tools::review_tool(),
        }
    }

    /// Run the loop to completion for `request`
    pub async fn answer(&self, request: &QueryRequest) -> Result<AgentAnswer, AgentError> {
        info!(
            "Answering query over {:?} with {} ({})",
            request.collections,
            self.llm.model_name(),
            self.llm.provider_name()
        );

        let schema_summary = self
            .database
            .summarize_schema(&request.collections, request.example_count)
            .await
            .map_err(AgentError::SchemaDiscovery)?;
        debug!("Schema summary:\n{}", schema_summary);

        let mut state = LoopState::new(Conversation::new(prompts::initial_turns(
            &request.collections,
            &schema_summary,
            &request.description,
            &request.query,
        )));
        let mut phase = Phase::Generating;

        loop {
            debug!(
                "Phase {:?}, iteration {}/{}",
                phase, state.iteration_count, request.max_iterations
            );
            phase = match phase {
                Phase::Generating => {
                    if self.generate(&mut state, request).await? {
                        Phase::Reviewing
                    } else if state.failed {
                        self.after_attempt(&mut state, request)?
                    } else {
                        let output = prompts::OFF_TOPIC_MESSAGE.to_string();
                        info!("Query judged off-topic, skipping execution");
                        return Ok(AgentAnswer {
                            output,
                            iterations: state.iteration_count,
                            kind: AnswerKind::OffTopic,
                            conversation: state.conversation,
                        });
                    }
                }
                Phase::Reviewing => {
                    if self.review(&mut state, request).await? {
                        Phase::Executing
                    } else {
                        self.after_attempt(&mut state, request)?
                    }
                }
                Phase::Executing => {
                    self.execute(&mut state, request).await;
                    self.after_attempt(&mut state, request)?
                }
                Phase::Summarizing => {
                    let output = self
                        .llm
                        .chat(state.conversation.turns(), request.temperature)
                        .await?;
                    state.conversation.push_assistant(output.clone());
                    info!("Answer ready after {} iteration(s)", state.iteration_count);
                    return Ok(AgentAnswer {
                        output,
                        iterations: state.iteration_count,
                        kind: AnswerKind::Summarized,
                        conversation: state.conversation,
                    });
                }
            };
        }
    }

    /// GENERATING
    ///
    /// Returns `true` when a proposal is ready for review, `false` when the
    /// query is off-topic or the attempt failed (`state.failed` tells which).
    async fn generate(
        &self,
        state: &mut LoopState,
        request: &QueryRequest,
    ) -> Result<bool, AgentError> {
        state.failed = false;
        let call = self
            .llm
            .chat_with_tool(
                state.conversation.turns(),
                &self.execution_tool,
                request.temperature,
            )
            .await?;
        debug!("Proposal arguments: {}", call.arguments);

        let allow_off_topic = state.iteration_count == 0;
        match PipelineProposal::from_tool_arguments(call.arguments, allow_off_topic) {
            Ok(proposal) => {
                state
                    .conversation
                    .push_assistant(prompts::proposal_acknowledgment(&proposal));
                let ready = !proposal.analysis_failed;
                if ready {
                    info!(
                        "Proposed pipeline on '{}': {}",
                        proposal.collection_name,
                        proposal.pipeline_text()
                    );
                }
                state.current_proposal = Some(proposal);
                Ok(ready)
            }
            Err(ProposalError::Pipeline {
                collection_name,
                raw_pipeline,
                source,
            }) => {
                warn!("Undecodable pipeline for '{}': {}", collection_name, source);
                state.current_proposal = None;
                state.conversation.push_assistant(prompts::pipeline_acknowledgment(
                    &raw_pipeline,
                    &collection_name,
                ));
                state.fail_with(prompts::undecodable_pipeline(&raw_pipeline, &source));
                Ok(false)
            }
            Err(ProposalError::Generation(e)) => Err(e.into()),
        }
    }

    /// REVIEWING; `true` when the verdict is clean
    async fn review(&self, state: &mut LoopState, request: &QueryRequest) -> Result<bool, AgentError> {
        let Some(proposal) = state.current_proposal.as_ref() else {
            state.fail_with(prompts::execution_error("no pipeline was provided"));
            return Ok(false);
        };
        state
            .conversation
            .push_user(prompts::review_request(&request.query, proposal));

        let call = self
            .llm
            .chat_with_tool(state.conversation.turns(), &self.review_tool, request.temperature)
            .await?;
        let verdict = ReviewVerdict::from_tool_arguments(call.arguments)?;

        if verdict.is_clean() {
            info!("Review passed");
            return Ok(true);
        }

        info!("Review raised {:?}", verdict.raised_flags());
        let feedback = prompts::revision_feedback(&verdict, proposal);
        state
            .conversation
            .push_assistant(prompts::review_acknowledgment());
        state.fail_with(feedback);
        Ok(false)
    }

    /// EXECUTING; outcome is recorded in `state.failed`
    async fn execute(&self, state: &mut LoopState, request: &QueryRequest) {
        let Some(proposal) = state.current_proposal.as_ref() else {
            state.fail_with(prompts::execution_error("no pipeline was provided"));
            return;
        };

        let result = match proposal.pipeline.as_ref() {
            Some(pipeline) => {
                self.database
                    .run_pipeline(
                        &proposal.collection_name,
                        pipeline,
                        request.max_output_count.saturating_add(1),
                    )
                    .await
            }
            None => Err(QueryExecutionError::new(format!(
                "no pipeline was provided for collection '{}'",
                proposal.collection_name
            ))),
        };

        match result {
            Ok(mut rows) => {
                let truncated = rows.len() > request.max_output_count;
                rows.truncate(request.max_output_count);
                info!("Pipeline returned {} row(s), truncated: {}", rows.len(), truncated);
                state.conversation.push_user(prompts::execution_results(
                    &rows,
                    request.max_output_count,
                    truncated,
                ));
                state.failed = false;
            }
            Err(e) => {
                warn!("Pipeline execution failed: {}", e);
                state.fail_with(prompts::execution_error(&e.message));
            }
        }
    }

    /// Termination check after an attempt
    fn after_attempt(&self, state: &mut LoopState, request: &QueryRequest) -> Result<Phase, AgentError> {
        state.iteration_count += 1;
        if !state.failed {
            return Ok(Phase::Summarizing);
        }
        if state.iteration_count >= request.max_iterations {
            warn!(
                "Giving up after {} failed attempt(s)",
                state.iteration_count
            );
            return Err(AgentError::IterationLimit {
                iterations: state.iteration_count,
                last_feedback: state.last_feedback.take(),
            });
        }
        Ok(Phase::Generating)
    }
}
