//! Structured tier: decode the JSON object embedded in a response
//!
//! The span from the first `{` to the last `}` is decoded verbatim. Anything
//! outside it (prose, markdown fences) is ignored; nothing inside it is repaired.

use serde_json::{Map, Value};

use crate::domain::ActionDomain;
use crate::error::{AgentError, Result};

/// Keys a code response must carry
pub const CODE_KEYS: &[&str] = &["code", "tests", "analysis", "continue"];

/// Keys a command response must carry
pub const COMMAND_KEYS: &[&str] = &["analysis", "commands"];

/// Decoded payload, before any normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Command {
        analysis: String,
        commands: Vec<String>,
        continuation: bool,
        findings: Vec<String>,
    },
    Code {
        code: String,
        tests: String,
        analysis: String,
        continuation: bool,
        findings: Vec<String>,
    },
}

/// Slice from the first `{` to the last `}`, if the first precedes the last
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end { Some(&text[start..=end]) } else { None }
}

/// Decode the embedded object and check the keys `domain` requires
pub fn parse(text: &str, domain: ActionDomain) -> Result<Payload> {
    let span = object_span(text).ok_or_else(|| AgentError::Parse("no JSON object found".to_string()))?;
    let value: Value = serde_json::from_str(span).map_err(|e| AgentError::Parse(format!("invalid JSON: {}", e)))?;
    let Value::Object(object) = value else {
        return Err(AgentError::Parse("payload is not an object".to_string()));
    };

    let required = match domain {
        ActionDomain::Code => CODE_KEYS,
        ActionDomain::Command => COMMAND_KEYS,
    };
    let missing: Vec<&str> = required.iter().copied().filter(|k| !object.contains_key(*k)).collect();
    if !missing.is_empty() {
        return Err(AgentError::Parse(format!("missing keys: {}", missing.join(", "))));
    }

    let analysis = text_of(&object["analysis"]);
    let findings = object.get("findings").map(string_list).unwrap_or_default();

    match domain {
        ActionDomain::Command => Ok(Payload::Command {
            analysis,
            commands: command_list(&object["commands"])?,
            continuation: continuation(&object, true)?,
            findings,
        }),
        ActionDomain::Code => Ok(Payload::Code {
            code: required_string(&object, "code")?,
            tests: required_string(&object, "tests")?,
            analysis,
            continuation: continuation(&object, true)?,
            findings,
        }),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn command_list(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Array(_) | Value::String(_) => Ok(string_list(value)),
        Value::Null => Ok(Vec::new()),
        other => Err(AgentError::Parse(format!("commands must be a list, got {}", other))),
    }
}

fn continuation(object: &Map<String, Value>, default: bool) -> Result<bool> {
    match object.get("continue") {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(other) => Err(AgentError::Parse(format!("continue must be a boolean, got {}", other))),
    }
}

fn required_string(object: &Map<String, Value>, key: &str) -> Result<String> {
    object[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AgentError::Parse(format!("{} must be a string", key)))
}
