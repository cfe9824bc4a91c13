//! System prompt for the calendar assistant.
//!
//! Wraps the tool listing from the registry with the harness context the
//! model needs: which time zone events are registered in and the exact
//! date-time format the calendar tools expect. An optional operator-supplied
//! prompt file is appended after the harness preamble.

use std::path::Path;

use crate::error::ConfigError;

use super::registry::ToolRegistry;

/// Build the system prompt.
///
/// The resulting prompt has this structure:
/// 1. Harness preamble (role, time zone, tools, date-time rules)
/// 2. Separator and operator prompt, if `extra` is given
pub fn build_system_prompt(registry: &ToolRegistry, time_zone: &str, extra: Option<&str>) -> String {
    let tool_descriptions = registry.describe();
    let mut prompt = format!(
        "\
You are a personal secretary with access to the operator's calendar.

## Environment
- New events are registered in the time zone: {time_zone}
- Use the time_now tool whenever you need the current date or time

## Available Tools
{tool_descriptions}
## Rules
- When you pass date-times to calendar_event_register, always use RFC3339 format \
with an explicit offset (for example 2026-10-20T10:00:00+09:00)
- If a tool returns an error field, explain the problem or retry with corrected arguments"
    );

    if let Some(extra) = extra.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\n## Operator Instructions\n\n---\n\n");
        prompt.push_str(extra);
    }
    prompt
}

/// Read the optional operator prompt file.
pub async fn load_operator_prompt(path: &Path) -> Result<String, ConfigError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
