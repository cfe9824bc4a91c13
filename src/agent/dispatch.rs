//! Tool-call dispatch loop.
//!
//! One user turn runs `AwaitingModelResponse -> {EmittingText | HandlingToolCall}`:
//!
//! 1. Send the session to the model.
//! 2. If the reply has no tool calls, print any text and finish the turn.
//! 3. Otherwise validate and execute each call in order, append the results,
//!    and go back to 1.
//!
//! Rounds of tool calls per turn are capped by `max_tool_rounds` so a model
//! stuck in a tool-call loop cannot run forever. Tool execution is strictly
//! sequential: each result is recorded before the next call runs.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::model::{ModelConversation, ModelReply};
use super::registry::ToolRegistry;
use super::session::{ConversationSession, ToolCallRequest, ToolCallResult, Turn};
use super::tools::ToolExecutor;
use super::validator::check_call;
use crate::error::{DispatchError, ModelError, ValidationError};

/// What to do when the model names a tool that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownToolPolicy {
    /// Feed the error back to the model as a tool result.
    #[default]
    Report,
    /// End the turn with [`DispatchError::UnknownFunction`].
    Abort,
}

impl FromStr for UnknownToolPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(UnknownToolPolicy::Report),
            "abort" => Ok(UnknownToolPolicy::Abort),
            other => Err(format!("expected 'report' or 'abort', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_tool_rounds: usize,
    pub unknown_tool_policy: UnknownToolPolicy,
    pub model_timeout: Duration,
    /// Extra attempts after a failed model round-trip.
    pub model_retries: u32,
    pub retry_delay: Duration,
    /// Print `RESP:` / `CALL:` lines to stdout.
    pub echo: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            unknown_tool_policy: UnknownToolPolicy::Report,
            model_timeout: Duration::from_secs(120),
            model_retries: 1,
            retry_delay: Duration::from_millis(500),
            echo: true,
        }
    }
}

/// What happened during one user turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// Text the model produced, in order.
    pub texts: Vec<String>,
    /// Every tool result fed back to the model, in order.
    pub tool_results: Vec<ToolCallResult>,
    pub rounds: usize,
}

impl TurnOutcome {
    /// The last text the model produced this turn.
    pub fn final_text(&self) -> Option<&str> {
        self.texts.last().map(String::as_str)
    }
}

pub struct DispatchLoop<M> {
    model: M,
    registry: ToolRegistry,
    executor: ToolExecutor,
    session: ConversationSession,
    settings: DispatchSettings,
}

impl<M: ModelConversation> DispatchLoop<M> {
    pub fn new(
        model: M,
        registry: ToolRegistry,
        executor: ToolExecutor,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            model,
            registry,
            executor,
            session: ConversationSession::new(),
            settings,
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Drive one user prompt until the model answers without tool calls.
    pub async fn run_turn(&mut self, prompt: &str) -> Result<TurnOutcome, DispatchError> {
        self.session.push(Turn::User(prompt.to_string()));
        let mut outcome = TurnOutcome::default();

        loop {
            let reply = self.ask_model().await?;

            for text in reply.texts.into_iter().filter(|t| !t.is_empty()) {
                if self.settings.echo {
                    println!("RESP: {text}");
                }
                self.session.push(Turn::Assistant(text.clone()));
                outcome.texts.push(text);
            }

            if reply.tool_calls.is_empty() {
                return Ok(outcome);
            }

            if outcome.rounds >= self.settings.max_tool_rounds {
                tracing::warn!(
                    limit = self.settings.max_tool_rounds,
                    "Tool-call round limit reached"
                );
                return Err(DispatchError::ToolRoundLimit {
                    limit: self.settings.max_tool_rounds,
                });
            }
            outcome.rounds += 1;

            self.session.push(Turn::ToolCalls(reply.tool_calls.clone()));
            for call in &reply.tool_calls {
                let result = self.handle_tool_call(call).await?;
                self.session.push(Turn::ToolResult(result.clone()));
                outcome.tool_results.push(result);
            }
        }
    }

    async fn handle_tool_call(
        &self,
        call: &ToolCallRequest,
    ) -> Result<ToolCallResult, DispatchError> {
        if self.settings.echo {
            println!("CALL: {}", call.name);
        }
        tracing::info!(tool = %call.name, call_id = %call.call_id, "Tool call");

        let invocation = match check_call(&self.registry, &call.name, &call.arguments) {
            Ok(invocation) => invocation,
            Err(ValidationError::UnknownTool(name))
                if self.settings.unknown_tool_policy == UnknownToolPolicy::Abort =>
            {
                return Err(DispatchError::UnknownFunction(name));
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, "Rejected tool arguments: {}", e);
                return Ok(ToolCallResult::failure(call, e.to_string()));
            }
        };

        let result = match self.executor.execute(invocation).await {
            Ok(payload) => ToolCallResult::success(call, payload),
            Err(message) => ToolCallResult::failure(call, message),
        };
        tracing::debug!(tool = %call.name, error = result.is_error(), "Tool finished");
        Ok(result)
    }

    /// One model round-trip with timeout and bounded retries.
    async fn ask_model(&self) -> Result<ModelReply, ModelError> {
        let mut attempt: u32 = 0;
        loop {
            let result = match tokio::time::timeout(
                self.settings.model_timeout,
                self.model.respond(&self.session),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ModelError::Timeout(self.settings.model_timeout)),
            };

            match result {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.settings.model_retries => {
                    let delay = self.settings.retry_delay * 2u32.saturating_pow(attempt);
                    tracing::warn!(attempt = attempt + 1, "Model call failed, retrying in {:?}: {}", delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
