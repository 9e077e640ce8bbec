//! Conversation turn builders
//!
//! Pure functions producing the text of every turn the review loop appends.
//! Nothing here talks to a model or a database.

use serde_json::Value;

use crate::llm_client::ChatMessage;
use crate::pipeline::PipelineError;
use crate::proposal::{PipelineProposal, ReviewVerdict};
use crate::tools::EXECUTION_TOOL;

/// Reply used when the model flags the question as unrelated
pub const OFF_TOPIC_MESSAGE: &str =
    "The question is not relevant to the current topic or discussion.";

const RULE: &str = "=========================================";

/// Agent role, the collections in scope and their schema summary
pub fn system_prompt(collections: &[String], schema_summary: &str, description: &str) -> String {
    format!(
        r#"As a MongoDB agent, your main responsibility is to interact with a MongoDB database. For each task assigned to you, you must create a syntactically correct aggregation pipeline. The pipeline is passed to a tool that runs it with the aggregate command of the specified collection and reports the output.

You have been granted access to the following collections within the user database:

**Collection List:**
{collections:?}

**Detailed Descriptions of Each Collection:**
=============
{schema_summary}
=============

**User given Database Description:**
{description}

Based on the information provided, construct the pipeline that answers the user query."#
    )
}

/// Tool instructions, one worked example and the user's question
pub fn user_prompt(query: &str) -> String {
    format!(
        r#"Answer the following question as best you can. You have access to the following tool:

"{EXECUTION_TOOL}"
Runs the given aggregation pipeline on a collection. It returns the output, or the error raised if the pipeline is incorrect.
Args:
    collection_name: collection the pipeline runs against.
    pipeline: JSON array of aggregation stages to run on that collection.
    analysis_failed: true if the question is not about querying the database.

You must use the tool '{EXECUTION_TOOL}' to run the pipeline.

Respond with a single tool call carrying a single pipeline. Multiple tool calls are strictly prohibited.

EXAMPLE
----
user_query: "How many users are there in the Users collection?"
AI Assistant:
"action": "{EXECUTION_TOOL}",
"action_input": {{"pipeline": "[{{\"$group\": {{\"_id\": null, \"count\": {{\"$sum\": 1}}}}}}]", "collection_name": "Users", "analysis_failed": false}}

Begin!

user_query: {query}"#
    )
}

/// System and user turns opening every session
pub fn initial_turns(
    collections: &[String],
    schema_summary: &str,
    description: &str,
    query: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(collections, schema_summary, description)),
        ChatMessage::user(user_prompt(query)),
    ]
}

/// Assistant turn echoing what the model proposed
pub fn proposal_acknowledgment(proposal: &PipelineProposal) -> String {
    if proposal.analysis_failed {
        return OFF_TOPIC_MESSAGE.to_string();
    }
    pipeline_acknowledgment(&proposal.pipeline_text(), &proposal.collection_name)
}

/// Assistant turn echoing pipeline text as received, decodable or not
pub fn pipeline_acknowledgment(pipeline_text: &str, collection_name: &str) -> String {
    format!(
        "Here's the answer to your query:\nThe AI-generated pipeline is: {pipeline_text}\nIt searches through the data in: \"{collection_name}\" collection"
    )
}

/// User turn asking the model to critique its proposal
pub fn review_request(query: &str, proposal: &PipelineProposal) -> String {
    format!(
        "Please review the following AI-generated pipeline based on the conditions given in the tool.\n\
         The user's original question was: {query}\n\n\
         The AI has created this aggregation pipeline for the database:\n\
         pipeline: {}\n\
         It runs against the collection: {}",
        proposal.pipeline_text(),
        proposal.collection_name
    )
}

pub fn review_acknowledgment() -> &'static str {
    "I've reviewed the AI-generated aggregation pipeline and shared the results."
}

pub fn intermediate_explanation(reason: &str) -> String {
    format!(
        "The current AI-generated pipeline won't return all the results relevant to the user question. This is because {reason}.\n\
         Please update the pipeline to fix this issue. If the pipeline is missing, make sure to provide a proper one in the tool call."
    )
}

pub fn raw_output_explanation(reason: &str) -> String {
    format!(
        "The AI-generated pipeline returns technical details and raw output that may be confusing. This is because {reason}.\n\
         Please modify the pipeline to make the output easier to understand."
    )
}

pub fn dml_explanation(reason: &str) -> String {
    format!(
        "The AI-generated pipeline includes operations that could change, update or delete data. This is because {reason}.\n\
         Please revise the pipeline to remove any data modification operations."
    )
}

pub fn incorrect_explanation(reason: &str) -> String {
    format!(
        "The AI-generated pipeline is not correct. This is because {reason}.\n\
         Please revise the pipeline to avoid any error in fetching data. If the pipeline is missing, make sure to provide a proper one in the tool call."
    )
}

/// Explanations for every raised flag, in the fixed order
/// intermediate, raw output, DML, incorrect
pub fn flag_explanations(verdict: &ReviewVerdict) -> Vec<String> {
    let mut issues = Vec::new();
    if verdict.is_intermediate {
        issues.push(intermediate_explanation(&verdict.intermediate_reason));
    }
    if verdict.has_raw_output {
        issues.push(raw_output_explanation(&verdict.raw_output_reason));
    }
    if verdict.has_dml {
        issues.push(dml_explanation(&verdict.dml_reason));
    }
    if verdict.incorrect {
        issues.push(incorrect_explanation(&verdict.incorrect_reason));
    }
    issues
}

/// User turn listing the review's issues and the pipeline to fix
pub fn revision_feedback(verdict: &ReviewVerdict, proposal: &PipelineProposal) -> String {
    format!(
        "I found a couple of problems with the AI-generated pipeline:\n\
         Issues are as follows:\n{}\n\n\
         Here is the AI-generated pipeline.\n\
         Please rectify it:\n{}",
        flag_explanations(verdict).join("\n\n"),
        proposal.pipeline_text()
    )
}

/// User turn carrying execution results
///
/// `rows` is already capped at `max_output_count`; `truncated` says whether
/// the cursor had more.
pub fn execution_results(rows: &[Value], max_output_count: usize, truncated: bool) -> String {
    let rendered = format!("{:#}", Value::Array(rows.to_vec()));
    let mut text = format!(
        "The AI-generated pipeline worked and returned the following results:\n{RULE}\n{rendered}\n{RULE}\n\n"
    );
    if truncated {
        text.push_str(&format!(
            "However, the pipeline returned more than {max_output_count} results. To keep the output manageable, only the first {max_output_count} results are shown above. "
        ));
    }
    text.push_str(
        "Please take a look at the results above and format the output in an easy-to-read way for the user.",
    );
    text
}

/// User turn carrying the database's own error text
pub fn execution_error(error: &str) -> String {
    format!(
        "The AI-generated pipeline did not work and returned the following error:\n{RULE}\n{error}\n{RULE}\n\n\
         Please modify the AI-generated pipeline accordingly to avoid errors."
    )
}

/// User turn sent when the pipeline text could not be decoded
pub fn undecodable_pipeline(raw_pipeline: &str, error: &PipelineError) -> String {
    format!(
        "The AI-generated pipeline could not be decoded: {error}.\n\
         Received pipeline: {raw_pipeline}\n\
         Provide the pipeline as a JSON array of stage objects, using double quotes, null, true and false."
    )
}

/// Used when the request carries no database description
pub fn default_description() -> &'static str {
    r#"Here are some refined guidelines for constructing an aggregation pipeline:

1. Always use the User ID to look up information. If you only have details like an email or a Discord name, first find the User ID in the user collection and use it to get information from other collections.

2. MongoDB doesn't allow comparing two fields with simple operators like `$gte` or `$lte` in a `$match` stage. Use the `$expr` operator instead, which accepts aggregation expressions.

3. Don't use `{"$date": "date_string"}` in your queries. Use the date string directly, like `{"$gte": "2024-05-20T00:00:00Z", "$lte": "2024-06-10T23:59:59Z"}`, and it will be compared as a date."#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use serde_json::json;

    fn verdict() -> ReviewVerdict {
        ReviewVerdict {
            incorrect: true,
            incorrect_reason: "the $group key is wrong".into(),
            is_intermediate: true,
            intermediate_reason: "only user ids are fetched".into(),
            has_dml: false,
            dml_reason: "no writes".into(),
            has_raw_output: true,
            raw_output_reason: "bare object ids".into(),
        }
    }

    fn proposal() -> PipelineProposal {
        PipelineProposal {
            collection_name: "Users".into(),
            pipeline: Some(Pipeline::parse(r#"[{"$limit": 1}]"#).unwrap()),
            analysis_failed: false,
        }
    }

    #[test]
    fn test_initial_turns_carry_schema_and_query() {
        let turns = initial_turns(
            &["Users".to_string()],
            "Name of Collection : Users",
            "guidelines",
            "How many users?",
        );
        assert_eq!(turns.len(), 2);
        assert!(turns[0].content.contains("[\"Users\"]"));
        assert!(turns[0].content.contains("Name of Collection : Users"));
        assert!(turns[0].content.contains("guidelines"));
        assert!(turns[1].content.ends_with("user_query: How many users?"));
        assert!(turns[1].content.contains(EXECUTION_TOOL));
    }

    #[test]
    fn test_user_prompt_example_is_valid_json() {
        let prompt = user_prompt("q");
        assert!(prompt.contains(r#""pipeline": "[{\"$group\": {\"_id\": null, \"count\": {\"$sum\": 1}}}]""#));
    }

    #[test]
    fn test_acknowledgment_variants() {
        let mut p = proposal();
        let ack = proposal_acknowledgment(&p);
        assert!(ack.contains(r#"[{"$limit":1}]"#));
        assert!(ack.contains("\"Users\" collection"));

        p.analysis_failed = true;
        assert_eq!(proposal_acknowledgment(&p), OFF_TOPIC_MESSAGE);
    }

    #[test]
    fn test_feedback_order_and_omission() {
        let text = revision_feedback(&verdict(), &proposal());
        let intermediate = text.find("only user ids are fetched").unwrap();
        let raw = text.find("bare object ids").unwrap();
        let incorrect = text.find("the $group key is wrong").unwrap();
        assert!(intermediate < raw && raw < incorrect);
        assert!(!text.contains("no writes"));
        assert!(text.ends_with(r#"[{"$limit":1}]"#));
    }

    #[test]
    fn test_results_truncation_notice() {
        let rows = vec![json!({"count": 3})];
        let plain = execution_results(&rows, 30, false);
        assert!(plain.contains("\"count\": 3"));
        assert!(!plain.contains("more than"));

        let cut = execution_results(&rows, 1, true);
        assert!(cut.contains("more than 1 results"));
        assert!(cut.contains("only the first 1 results"));
    }

    #[test]
    fn test_error_turn_carries_raw_text() {
        let text = execution_error("ns does not exist");
        assert!(text.contains("\nns does not exist\n"));
    }
}
