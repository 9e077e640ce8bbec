//! Chat-completions wire format
//!
//! OpenAI and Mistral share the same request/response shape for chat
//! completions with function tools; only the endpoint and the value used to
//! force a tool call differ. Both clients build on the helpers here.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::GenerationError;
use crate::llm_client::{ChatMessage, ToolCallResult, ToolDefinition};

/// Longest payload excerpt written to debug logs
const LOG_EXCERPT: usize = 1000;

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCall {
    pub name: String,
    /// OpenAI sends a JSON-encoded string; some Mistral deployments send an object
    pub arguments: Value,
}

/// Build a chat-completions request body
///
/// With `tool` set, the request declares that single tool and forces the
/// model to call it using the provider's `tool_choice` value.
pub(crate) fn request_body(
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
    tool: Option<(&ToolDefinition, &str)>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
    });

    if let Some((tool, tool_choice)) = tool {
        body["tools"] = json!([{
            "type": "function",
            "function": {
                "name": &tool.name,
                "description": &tool.description,
                "parameters": &tool.parameters
            }
        }]);
        body["tool_choice"] = json!(tool_choice);
    }

    body
}

/// POST a request body and decode the completion envelope
pub(crate) async fn send(
    http: &reqwest::Client,
    provider: &'static str,
    url: &str,
    api_key: &str,
    body: &Value,
) -> Result<CompletionResponse, GenerationError> {
    let response = http
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|source| GenerationError::Transport { provider, source })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| GenerationError::Transport { provider, source })?;

    if !status.is_success() {
        return Err(GenerationError::Api {
            provider,
            status: status.as_u16(),
            body: text,
        });
    }

    tracing::debug!("{} raw response: {}", provider, excerpt(&text));

    serde_json::from_str(&text).map_err(|e| GenerationError::MalformedResponse {
        provider,
        reason: e.to_string(),
    })
}

/// Free-text content of the first choice
pub(crate) fn into_text(
    provider: &'static str,
    response: CompletionResponse,
) -> Result<String, GenerationError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse {
            provider,
            reason: "response contained no choices".to_string(),
        })?;

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GenerationError::EmptyCompletion),
    }
}

/// The single tool call of the first choice
pub(crate) fn into_tool_call(
    provider: &'static str,
    response: CompletionResponse,
    tool: &ToolDefinition,
) -> Result<ToolCallResult, GenerationError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse {
            provider,
            reason: "response contained no choices".to_string(),
        })?;

    let mut calls = choice.message.tool_calls.unwrap_or_default();
    match calls.len() {
        0 => {
            return Err(GenerationError::NoToolCall {
                expected: tool.name.clone(),
            })
        }
        1 => {}
        count => {
            return Err(GenerationError::MultipleToolCalls {
                expected: tool.name.clone(),
                count,
            })
        }
    }

    let call = calls.remove(0).function;
    if call.name != tool.name {
        return Err(GenerationError::UnexpectedTool {
            expected: tool.name.clone(),
            got: call.name,
        });
    }

    let arguments = match call.arguments {
        Value::String(raw) => {
            serde_json::from_str(&raw).map_err(|e| GenerationError::MalformedArguments {
                tool: tool.name.clone(),
                reason: e.to_string(),
            })?
        }
        other => other,
    };

    if !arguments.is_object() {
        return Err(GenerationError::MalformedArguments {
            tool: tool.name.clone(),
            reason: "arguments are not a JSON object".to_string(),
        });
    }

    tracing::debug!(
        "{} {} arguments: {}",
        provider,
        tool.name,
        excerpt(&arguments.to_string())
    );

    Ok(ToolCallResult {
        tool_name: call.name,
        arguments,
    })
}

fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(LOG_EXCERPT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
