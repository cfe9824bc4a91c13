//! Conversation transcript owned by the dispatch loop.

use serde_json::{json, Map, Value};

/// A model-issued request to run a named tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    /// Provider-assigned id, echoed back on the matching result.
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Outcome of one tool call: a payload object or an error message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub call_id: String,
    pub name: String,
    pub outcome: Result<Map<String, Value>, String>,
}

impl ToolCallResult {
    pub fn success(request: &ToolCallRequest, payload: Map<String, Value>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            name: request.name.clone(),
            outcome: Ok(payload),
        }
    }

    pub fn failure(request: &ToolCallRequest, error: impl Into<String>) -> Self {
        Self {
            call_id: request.call_id.clone(),
            name: request.name.clone(),
            outcome: Err(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// The JSON object resubmitted to the model: the payload itself, or
    /// `{"error": "..."}`.
    pub fn to_response_value(&self) -> Value {
        match &self.outcome {
            Ok(payload) => Value::Object(payload.clone()),
            Err(message) => json!({ "error": message }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User(String),
    Assistant(String),
    ToolCalls(Vec<ToolCallRequest>),
    ToolResult(ToolCallResult),
}

/// Append-only sequence of turns for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    turns: Vec<Turn>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
