//! Static tool descriptors advertised to the model.
//!
//! Each [`ToolDescriptor`] is the single source of truth for a tool's name,
//! purpose, and parameter shape: it renders the `genai` JSON schema sent to
//! the model, the human-readable listing in the system prompt, and drives the
//! argument validator.

use std::collections::HashSet;

use genai::chat::Tool;
use serde_json::{json, Map, Value};

use crate::error::ConfigError;

pub const TIME_NOW: &str = "time_now";
pub const CALENDAR_EVENT_LIST: &str = "calendar_event_list";
pub const CALENDAR_EVENT_REGISTER: &str = "calendar_event_register";

/// Primitive type expected for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    /// RFC 3339 string with an explicit offset.
    DateTime,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::DateTime => "RFC 3339 date-time string",
        }
    }

    fn schema(self) -> Value {
        match self {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::DateTime => json!({"type": "string", "format": "date-time"}),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
    /// Inclusive lower bound for integers.
    pub minimum: Option<i64>,
}

impl ParameterSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
            minimum: None,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
            minimum: None,
        }
    }

    pub const fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    /// JSON schema for the parameter object.
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut prop = param.kind.schema();
            prop["description"] = Value::String(param.description.to_string());
            if let Some(min) = param.minimum {
                prop["minimum"] = json!(min);
            }
            properties.insert(param.name.to_string(), prop);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Schema advertised to the model. Tools without parameters declare
    /// none; Gemini rejects object schemas with empty `properties`.
    pub fn parameters_schema(&self) -> Option<Value> {
        if self.parameters.is_empty() {
            None
        } else {
            Some(self.schema())
        }
    }

    pub fn to_genai_tool(&self) -> Tool {
        let tool = Tool::new(self.name).with_description(self.description);
        match self.parameters_schema() {
            Some(schema) => tool.with_schema(schema),
            None => tool,
        }
    }
}

/// The set of tools the model may call. Names are unique.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Build a registry, rejecting duplicate tool or parameter names.
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for tool in &tools {
            if !seen.insert(tool.name) {
                return Err(ConfigError::Invalid {
                    key: "tools".to_string(),
                    message: format!("duplicate tool name '{}'", tool.name),
                });
            }
            let mut params = HashSet::new();
            for param in &tool.parameters {
                if !params.insert(param.name) {
                    return Err(ConfigError::Invalid {
                        key: format!("tools.{}", tool.name),
                        message: format!("duplicate parameter name '{}'", param.name),
                    });
                }
            }
        }
        Ok(Self { tools })
    }

    /// The three calendar assistant tools.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::new(builtin_descriptors())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn to_genai_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_genai_tool).collect()
    }

    /// Markdown listing embedded in the system prompt.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for tool in &self.tools {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("### {}\n{}\n", tool.name, tool.description));
            if tool.parameters.is_empty() {
                out.push_str("- (no arguments)\n");
            }
            for p in &tool.parameters {
                let req = if p.required { "required" } else { "optional" };
                out.push_str(&format!(
                    "- **{}** ({}, {}): {}\n",
                    p.name,
                    p.kind.as_str(),
                    req,
                    p.description
                ));
            }
        }
        out
    }
}

fn builtin_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: TIME_NOW,
            description: "Get the current time in UTC",
            parameters: vec![],
        },
        ToolDescriptor {
            name: CALENDAR_EVENT_LIST,
            description: "List upcoming calendar events from now, ordered by start time",
            parameters: vec![
                ParameterSpec::required(
                    "count",
                    ParamKind::Integer,
                    "Number of upcoming events to list",
                )
                .with_minimum(0),
            ],
        },
        ToolDescriptor {
            name: CALENDAR_EVENT_REGISTER,
            description: "Register a new calendar event",
            parameters: vec![
                ParameterSpec::required(
                    "start",
                    ParamKind::DateTime,
                    "Start time of the event in RFC3339 format",
                ),
                ParameterSpec::required(
                    "end",
                    ParamKind::DateTime,
                    "End time of the event in RFC3339 format",
                ),
                ParameterSpec::required("summary", ParamKind::String, "Title of the event"),
                ParameterSpec::optional(
                    "description",
                    ParamKind::String,
                    "Simple description of the event",
                ),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_three_tools() {
        let registry = ToolRegistry::builtin().unwrap();
        let names: Vec<&str> = registry.descriptors().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![TIME_NOW, CALENDAR_EVENT_LIST, CALENDAR_EVENT_REGISTER]
        );
    }


    #[test]
    fn duplicate_tool_names_rejected() {
        let mut tools = builtin_descriptors();
        tools.push(tools[0].clone());
        let err = ToolRegistry::new(tools).unwrap_err();
        assert!(err.to_string().contains("duplicate tool name 'time_now'"));
    }

    #[test]
    fn duplicate_parameter_names_rejected() {
        let tool = ToolDescriptor {
            name: "dup",
            description: "",
            parameters: vec![
                ParameterSpec::required("a", ParamKind::String, ""),
                ParameterSpec::optional("a", ParamKind::Integer, ""),
            ],
        };
        assert!(ToolRegistry::new(vec![tool]).is_err());
    }

    #[test]
    fn schema_lists_required_fields_only() {
        let registry = ToolRegistry::builtin().unwrap();
        let schema = registry.get(CALENDAR_EVENT_REGISTER).unwrap().schema();
        assert_eq!(schema["required"], json!(["start", "end", "summary"]));
        assert_eq!(schema["properties"]["start"]["format"], "date-time");
        assert_eq!(schema["properties"]["description"]["type"], "string");
    }

    #[test]
    fn count_schema_carries_minimum() {
        let registry = ToolRegistry::builtin().unwrap();
        let schema = registry.get(CALENDAR_EVENT_LIST).unwrap().schema();
        assert_eq!(schema["properties"]["count"]["type"], "integer");
        assert_eq!(schema["properties"]["count"]["minimum"], 0);
    }

    #[test]
    fn genai_tools_have_descriptions() {
        for tool in ToolRegistry::builtin().unwrap().to_genai_tools() {
            assert!(tool.description.is_some(), "{} needs a description", tool.name);
        }
    }

    #[test]
    fn parameterless_tool_declares_no_schema() {
        let registry = ToolRegistry::builtin().unwrap();
        assert!(registry.get(TIME_NOW).unwrap().parameters_schema().is_none());

        let list = registry.get(CALENDAR_EVENT_LIST).unwrap().parameters_schema();
        assert_eq!(list.unwrap()["required"], json!(["count"]));
    }

    #[test]
    fn describe_mentions_every_tool() {
        let text = ToolRegistry::builtin().unwrap().describe();
        assert!(text.contains("### time_now"));
        assert!(text.contains("### calendar_event_list"));
        assert!(text.contains("**description** (string, optional)"));
    }
}
