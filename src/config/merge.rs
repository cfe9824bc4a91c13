use super::schema::{AppConfig, PartialConfig};
use crate::calendar::google::DEFAULT_API_BASE;
use std::path::PathBuf;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            model: self.model.or(fallback.model),
            model_timeout_secs: self.model_timeout_secs.or(fallback.model_timeout_secs),
            model_retries: self.model_retries.or(fallback.model_retries),
            max_tool_rounds: self.max_tool_rounds.or(fallback.max_tool_rounds),
            unknown_tool_policy: self.unknown_tool_policy.or(fallback.unknown_tool_policy),
            system_prompt_path: self.system_prompt_path.or(fallback.system_prompt_path),
            credentials_path: self.credentials_path.or(fallback.credentials_path),
            redirect_port: self.redirect_port.or(fallback.redirect_port),
            redirect_timeout_secs: self.redirect_timeout_secs.or(fallback.redirect_timeout_secs),
            shutdown_timeout_secs: self.shutdown_timeout_secs.or(fallback.shutdown_timeout_secs),
            calendar_api_base: self.calendar_api_base.or(fallback.calendar_api_base),
            time_zone: self.time_zone.or(fallback.time_zone),
            calendar_timeout_secs: self.calendar_timeout_secs.or(fallback.calendar_timeout_secs),
            mcp_port: self.mcp_port.or(fallback.mcp_port),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            model: self.model.unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            model_timeout_secs: self.model_timeout_secs.unwrap_or(120),
            model_retries: self.model_retries.unwrap_or(1),
            max_tool_rounds: self.max_tool_rounds.unwrap_or(8),
            unknown_tool_policy: self.unknown_tool_policy.unwrap_or_default(),
            system_prompt_path: self.system_prompt_path,
            credentials_path: self
                .credentials_path
                .unwrap_or_else(|| PathBuf::from("credentials.json")),
            redirect_port: self.redirect_port.unwrap_or(28080),
            redirect_timeout_secs: self.redirect_timeout_secs.unwrap_or(300),
            shutdown_timeout_secs: self.shutdown_timeout_secs.unwrap_or(10),
            calendar_api_base: self
                .calendar_api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            time_zone: self.time_zone.unwrap_or_else(|| "Asia/Tokyo".to_string()),
            calendar_timeout_secs: self.calendar_timeout_secs.unwrap_or(30),
            mcp_port: self.mcp_port.unwrap_or(8080),
        }
    }
}
