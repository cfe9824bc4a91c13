use serde::Deserialize;
use std::path::PathBuf;

use crate::agent::dispatch::UnknownToolPolicy;

/// The TOML file structure for calmate.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub model: Option<ModelConfig>,
    pub auth: Option<AuthConfig>,
    pub calendar: Option<CalendarConfig>,
    pub mcp: Option<McpConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    pub name: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub max_tool_rounds: Option<usize>,
    pub unknown_tool_policy: Option<UnknownToolPolicy>,
    /// Extra instructions appended to the system prompt.
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub credentials: Option<String>,
    pub redirect_port: Option<u16>,
    pub redirect_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarConfig {
    pub api_base: Option<String>,
    pub time_zone: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct McpConfig {
    pub port: Option<u16>,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub model_timeout_secs: u64,
    pub model_retries: u32,
    pub max_tool_rounds: usize,
    pub unknown_tool_policy: UnknownToolPolicy,
    pub system_prompt_path: Option<PathBuf>,
    pub credentials_path: PathBuf,
    pub redirect_port: u16,
    pub redirect_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    pub calendar_api_base: String,
    pub time_zone: String,
    pub calendar_timeout_secs: u64,
    pub mcp_port: u16,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub model: Option<String>,
    pub model_timeout_secs: Option<u64>,
    pub model_retries: Option<u32>,
    pub max_tool_rounds: Option<usize>,
    pub unknown_tool_policy: Option<UnknownToolPolicy>,
    pub system_prompt_path: Option<PathBuf>,
    pub credentials_path: Option<PathBuf>,
    pub redirect_port: Option<u16>,
    pub redirect_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
    pub calendar_api_base: Option<String>,
    pub time_zone: Option<String>,
    pub calendar_timeout_secs: Option<u64>,
    pub mcp_port: Option<u16>,
}

impl ConfigFile {
    /// Flatten the sectioned file into a [`PartialConfig`].
    pub fn to_partial(&self) -> PartialConfig {
        let mut partial = PartialConfig::default();
        if let Some(model) = &self.model {
            partial.model = model.name.clone();
            partial.model_timeout_secs = model.timeout_secs;
            partial.model_retries = model.retries;
            partial.max_tool_rounds = model.max_tool_rounds;
            partial.unknown_tool_policy = model.unknown_tool_policy;
            partial.system_prompt_path = model.system_prompt.as_ref().map(PathBuf::from);
        }
        if let Some(auth) = &self.auth {
            partial.credentials_path = auth.credentials.as_ref().map(PathBuf::from);
            partial.redirect_port = auth.redirect_port;
            partial.redirect_timeout_secs = auth.redirect_timeout_secs;
            partial.shutdown_timeout_secs = auth.shutdown_timeout_secs;
        }
        if let Some(calendar) = &self.calendar {
            partial.calendar_api_base = calendar.api_base.clone();
            partial.time_zone = calendar.time_zone.clone();
            partial.calendar_timeout_secs = calendar.timeout_secs;
        }
        if let Some(mcp) = &self.mcp {
            partial.mcp_port = mcp.port;
        }
        partial
    }
}
