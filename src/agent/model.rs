//! Model conversation capability and its `genai` implementation.
//!
//! The dispatch loop only depends on [`ModelConversation`]: given the
//! transcript so far, return the model's next reply (text, tool calls, or
//! both). [`GenaiConversation`] rebuilds a [`ChatRequest`] from the session on
//! every call, so the session stays the single owner of conversation state.

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, Tool, ToolCall, ToolResponse};
use genai::Client;

use super::session::{ConversationSession, ToolCallRequest, Turn};
use crate::error::ModelError;

/// One model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Text parts in the order the model produced them.
    pub texts: Vec<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            texts: vec![text.into()],
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(call: ToolCallRequest) -> Self {
        Self {
            texts: Vec::new(),
            tool_calls: vec![call],
        }
    }
}

#[async_trait]
pub trait ModelConversation: Send + Sync {
    async fn respond(&self, session: &ConversationSession) -> Result<ModelReply, ModelError>;
}

/// Streams chat completions through `genai`. Provider credentials are read
/// by `genai` from the provider's standard environment variable.
pub struct GenaiConversation {
    client: Client,
    model: String,
    system_prompt: String,
    tools: Vec<Tool>,
}

impl GenaiConversation {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>, tools: Vec<Tool>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            tools,
        }
    }

    fn build_request(&self, session: &ConversationSession) -> ChatRequest {
        let mut chat_req =
            ChatRequest::from_system(&self.system_prompt).with_tools(self.tools.clone());
        for turn in session.turns() {
            chat_req = chat_req.append_message(to_chat_message(turn));
        }
        chat_req
    }
}

fn to_chat_message(turn: &Turn) -> ChatMessage {
    match turn {
        Turn::User(text) => ChatMessage::user(text.clone()),
        Turn::Assistant(text) => ChatMessage::assistant(text.clone()),
        Turn::ToolCalls(calls) => {
            let calls: Vec<ToolCall> = calls
                .iter()
                .map(|c| ToolCall {
                    call_id: c.call_id.clone(),
                    fn_name: c.name.clone(),
                    fn_arguments: c.arguments.clone(),
                    thought_signatures: None,
                })
                .collect();
            ChatMessage::from(calls)
        }
        Turn::ToolResult(result) => {
            ToolResponse::new(result.call_id.clone(), result.to_response_value().to_string())
                .into()
        }
    }
}

#[async_trait]
impl ModelConversation for GenaiConversation {
    async fn respond(&self, session: &ConversationSession) -> Result<ModelReply, ModelError> {
        let chat_options = ChatOptions::default()
            .with_capture_content(true)
            .with_capture_tool_calls(true);

        let stream_res = self
            .client
            .exec_chat_stream(&self.model, self.build_request(session), Some(&chat_options))
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let mut stream = stream_res.stream;
        let mut reply: Option<ModelReply> = None;
        let mut last_error: Option<String> = None;

        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatStreamEvent::End(end)) => {
                    let texts = end
                        .captured_texts()
                        .map(|parts| parts.into_iter().map(str::to_string).collect())
                        .unwrap_or_default();
                    let tool_calls = end
                        .captured_tool_calls()
                        .map(|calls| {
                            calls
                                .into_iter()
                                .map(|c| ToolCallRequest {
                                    call_id: c.call_id.clone(),
                                    name: c.fn_name.clone(),
                                    arguments: c.fn_arguments.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    reply = Some(ModelReply { texts, tool_calls });
                }
                Ok(_) => {
                    // Start, chunks, reasoning -- the captured End carries everything we need.
                }
                Err(e) => {
                    tracing::warn!("Stream error: {}", e);
                    // Continue -- the End event may still arrive.
                    last_error = Some(e.to_string());
                }
            }
        }

        reply.ok_or_else(|| {
            ModelError::Stream(last_error.unwrap_or_else(|| "no end event".to_string()))
        })
    }
}
