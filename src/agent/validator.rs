//! Schema-driven argument validation.
//!
//! The model sends a loosely typed JSON argument bag. [`validate`] checks it
//! against the tool's [`ToolDescriptor`] (required fields present, types
//! matching, integer bounds) and [`decode`] turns the checked bag into a
//! strongly typed [`ToolInvocation`]. Nothing reaches a tool implementation
//! without passing both.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use super::registry::{
    ParamKind, ToolDescriptor, ToolRegistry, CALENDAR_EVENT_LIST, CALENDAR_EVENT_REGISTER,
    TIME_NOW,
};
use crate::error::ValidationError;

/// A tool call whose arguments passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    TimeNow,
    ListEvents {
        count: u32,
    },
    RegisterEvent {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        summary: String,
        description: String,
    },
}

/// Arguments that matched their descriptor. Accessors only return values
/// for declared parameters of the declared kind.
#[derive(Debug, Clone)]
pub struct ValidatedArgs {
    tool: String,
    values: Map<String, Value>,
}

impl ValidatedArgs {
    fn string(&self, name: &str) -> Option<String> {
        self.values.get(name).and_then(Value::as_str).map(str::to_string)
    }

    fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(as_integer)
    }

    fn date_time(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    fn missing(&self, name: &str) -> ValidationError {
        ValidationError::MissingArgument {
            tool: self.tool.clone(),
            name: name.to_string(),
        }
    }
}

/// Look up `name` in the registry, validate `arguments`, and decode.
pub fn check_call(
    registry: &ToolRegistry,
    name: &str,
    arguments: &Value,
) -> Result<ToolInvocation, ValidationError> {
    let descriptor = registry
        .get(name)
        .ok_or_else(|| ValidationError::UnknownTool(name.to_string()))?;
    let args = validate(descriptor, arguments)?;
    decode(args)
}

/// Check `arguments` against `descriptor`. Unknown extra fields are ignored;
/// `null` counts as absent.
pub fn validate(
    descriptor: &ToolDescriptor,
    arguments: &Value,
) -> Result<ValidatedArgs, ValidationError> {
    let tool = descriptor.name.to_string();
    let empty = Map::new();
    let bag = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ValidationError::NotAnObject {
                tool,
                got: type_name(other).to_string(),
            });
        }
    };

    let mut values = Map::new();
    for param in &descriptor.parameters {
        let value = match bag.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(ValidationError::MissingArgument {
                        tool: tool.clone(),
                        name: param.name.to_string(),
                    });
                }
                continue;
            }
            Some(v) => v,
        };

        let mismatch = || ValidationError::TypeMismatch {
            tool: tool.clone(),
            name: param.name.to_string(),
            expected: param.kind.as_str().to_string(),
            got: describe_value(value),
        };

        match param.kind {
            ParamKind::String => {
                if !value.is_string() {
                    return Err(mismatch());
                }
            }
            ParamKind::Integer => {
                let n = as_integer(value).ok_or_else(mismatch)?;
                if let Some(minimum) = param.minimum {
                    if n < minimum {
                        return Err(ValidationError::BelowMinimum {
                            tool: tool.clone(),
                            name: param.name.to_string(),
                            minimum,
                            value: n,
                        });
                    }
                }
            }
            ParamKind::DateTime => {
                let s = value.as_str().ok_or_else(mismatch)?;
                if DateTime::parse_from_rfc3339(s).is_err() {
                    return Err(mismatch());
                }
            }
        }
        values.insert(param.name.to_string(), value.clone());
    }

    Ok(ValidatedArgs { tool, values })
}

/// Turn validated arguments into the per-tool record.
pub fn decode(args: ValidatedArgs) -> Result<ToolInvocation, ValidationError> {
    match args.tool.as_str() {
        TIME_NOW => Ok(ToolInvocation::TimeNow),
        CALENDAR_EVENT_LIST => {
            let count = args.integer("count").ok_or_else(|| args.missing("count"))?;
            let count = u32::try_from(count).map_err(|_| ValidationError::InvalidRange {
                tool: args.tool.clone(),
                message: format!("'count' is out of range: {count}"),
            })?;
            Ok(ToolInvocation::ListEvents { count })
        }
        CALENDAR_EVENT_REGISTER => {
            let start = args.date_time("start").ok_or_else(|| args.missing("start"))?;
            let end = args.date_time("end").ok_or_else(|| args.missing("end"))?;
            let summary = args.string("summary").ok_or_else(|| args.missing("summary"))?;
            let description = args.string("description").unwrap_or_default();
            if end < start {
                return Err(ValidationError::InvalidRange {
                    tool: args.tool.clone(),
                    message: format!("'end' ({end}) is before 'start' ({start})"),
                });
            }
            Ok(ToolInvocation::RegisterEvent {
                start,
                end,
                summary,
                description,
            })
        }
        other => Err(ValidationError::UnknownTool(other.to_string())),
    }
}

/// Integral JSON numbers. Models often send `3.0` for an integer field.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {s:?}"),
        Value::Number(n) => format!("number {n}"),
        other => type_name(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        ToolRegistry::builtin().unwrap()
    }

    #[test]
    fn time_now_accepts_no_arguments() {
        assert_eq!(
            check_call(&registry(), TIME_NOW, &json!({})).unwrap(),
            ToolInvocation::TimeNow
        );
        assert_eq!(
            check_call(&registry(), TIME_NOW, &Value::Null).unwrap(),
            ToolInvocation::TimeNow
        );
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = check_call(&registry(), "delete_everything", &json!({})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownTool("delete_everything".into()));
        assert!(err.to_string().contains("unknown function call"));
    }

    #[test]
    fn every_required_field_is_enforced() {
        let registry = registry();
        let valid = |name: &str| -> Value {
            match name {
                TIME_NOW => json!({}),
                CALENDAR_EVENT_LIST => json!({"count": 3}),
                CALENDAR_EVENT_REGISTER => json!({
                    "start": "2026-10-20T10:00:00+09:00",
                    "end": "2026-10-20T11:00:00+09:00",
                    "summary": "Dentist",
                }),
                other => panic!("no fixture for {other}"),
            }
        };

        for descriptor in registry.descriptors() {
            let full = valid(descriptor.name);
            assert!(
                check_call(&registry, descriptor.name, &full).is_ok(),
                "{} should accept a complete bag",
                descriptor.name
            );

            for param in descriptor.parameters.iter().filter(|p| p.required) {
                let mut partial = full.clone();
                partial.as_object_mut().unwrap().remove(param.name);
                match check_call(&registry, descriptor.name, &partial) {
                    Err(ValidationError::MissingArgument { name, .. }) => {
                        assert_eq!(name, param.name)
                    }
                    other => panic!(
                        "{} without '{}' should be rejected, got {other:?}",
                        descriptor.name, param.name
                    ),
                }
            }
        }
    }

    #[test]
    fn extra_unknown_fields_are_ignored() {
        let args = json!({"count": 2, "calendar": "work", "verbose": true});
        assert_eq!(
            check_call(&registry(), CALENDAR_EVENT_LIST, &args).unwrap(),
            ToolInvocation::ListEvents { count: 2 }
        );
    }

    #[test]
    fn integral_float_count_is_accepted() {
        let args = json!({"count": 3.0});
        assert_eq!(
            check_call(&registry(), CALENDAR_EVENT_LIST, &args).unwrap(),
            ToolInvocation::ListEvents { count: 3 }
        );
    }

    #[test]
    fn non_numeric_count_is_type_mismatch() {
        let err = check_call(&registry(), CALENDAR_EVENT_LIST, &json!({"count": "three"}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { ref name, .. } if name == "count"));
    }

    #[test]
    fn fractional_count_is_type_mismatch() {
        let err =
            check_call(&registry(), CALENDAR_EVENT_LIST, &json!({"count": 2.5})).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn negative_count_is_below_minimum() {
        let err =
            check_call(&registry(), CALENDAR_EVENT_LIST, &json!({"count": -1})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BelowMinimum {
                tool: CALENDAR_EVENT_LIST.into(),
                name: "count".into(),
                minimum: 0,
                value: -1,
            }
        );
    }

    #[test]
    fn null_required_argument_counts_as_missing() {
        let err =
            check_call(&registry(), CALENDAR_EVENT_LIST, &json!({"count": null})).unwrap_err();
        assert!(matches!(err, ValidationError::MissingArgument { .. }));
    }

    #[test]
    fn non_object_arguments_rejected() {
        let err = check_call(&registry(), CALENDAR_EVENT_LIST, &json!([3])).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { ref got, .. } if got == "array"));
    }

    #[test]
    fn description_defaults_to_empty() {
        let args = json!({
            "start": "2026-10-20T10:00:00+09:00",
            "end": "2026-10-20T11:00:00+09:00",
            "summary": "Dentist",
        });
        match check_call(&registry(), CALENDAR_EVENT_REGISTER, &args).unwrap() {
            ToolInvocation::RegisterEvent { description, summary, .. } => {
                assert_eq!(summary, "Dentist");
                assert_eq!(description, "");
            }
            other => panic!("unexpected invocation {other:?}"),
        }
    }

    #[test]
    fn non_rfc3339_start_is_type_mismatch() {
        let args = json!({
            "start": "soon",
            "end": "2026-10-20T11:00:00+09:00",
            "summary": "Dentist",
        });
        let err = check_call(&registry(), CALENDAR_EVENT_REGISTER, &args).unwrap_err();
        match err {
            ValidationError::TypeMismatch { name, got, .. } => {
                assert_eq!(name, "start");
                assert!(got.contains("soon"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn date_time_without_offset_is_rejected() {
        let args = json!({
            "start": "2026-10-20T10:00:00",
            "end": "2026-10-20T11:00:00+09:00",
            "summary": "Dentist",
        });
        assert!(check_call(&registry(), CALENDAR_EVENT_REGISTER, &args).is_err());
    }

    #[test]
    fn end_before_start_is_invalid_range() {
        let args = json!({
            "start": "2026-10-20T11:00:00+09:00",
            "end": "2026-10-20T10:00:00+09:00",
            "summary": "Backwards",
        });
        let err = check_call(&registry(), CALENDAR_EVENT_REGISTER, &args).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRange { .. }));
    }
}
