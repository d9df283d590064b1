//! Response normalizer: pull a JSON object out of noisy backend output.
//!
//! Small local models wrap their JSON in prose, markdown fences, or trailing
//! commentary. `extract_structured` finds the object and parses it without
//! touching its contents. `parse_reflection` then checks it against the
//! reflection schema.

use crate::backend::BackendError;
use crate::orchestrator::Reflection;
use lumen_core::Followup;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The span of the first parseable brace-balanced object in `raw`.
///
/// Candidates are found with a string- and escape-aware scan. A balanced span
/// that does not parse is skipped as a whole, so an object nested inside it is
/// never returned in its place. A `{` that never closes is skipped on its own.
/// If no candidate parses, falls back to the greedy span from the first `{` to
/// the last `}`.
pub fn locate_object(raw: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(offset) = raw[from..].find('{') {
        let start = from + offset;
        match balanced_end(raw, start) {
            Some(end) => {
                let span = &raw[start..=end];
                if serde_json::from_str::<Map<String, Value>>(span).is_ok() {
                    return Some(span);
                }
                from = end + 1;
            }
            None => from = start + 1,
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Byte index of the `}` closing the object opened at `start`.
fn balanced_end(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in raw.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// The first JSON object embedded in `raw`, or `None` if there is none or
/// it does not parse.
pub fn extract_structured(raw: &str) -> Option<Map<String, Value>> {
    let span = locate_object(raw)?;
    match serde_json::from_str(span) {
        Ok(obj) => Some(obj),
        Err(e) => {
            tracing::debug!("Located object span does not parse: {}", e);
            None
        }
    }
}

#[derive(Deserialize)]
struct RawReflection {
    reflection: String,
    summary: String,
    followups: Vec<Followup>,
    tone: String,
    #[serde(default)]
    safety_flag: Value,
}

/// Models emit the flag as a bool, a string, or leave it out.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Validate a parsed object against the reflection schema.
pub fn parse_reflection(backend: &str, obj: &Map<String, Value>) -> Result<Reflection, BackendError> {
    let raw: RawReflection = serde_json::from_value(Value::Object(obj.clone()))
        .map_err(|e| BackendError::malformed(backend, format!("schema mismatch: {}", e)))?;

    if raw.followups.len() != 2 {
        return Err(BackendError::malformed(
            backend,
            format!("expected 2 followups, got {}", raw.followups.len()),
        ));
    }
    if raw.reflection.trim().is_empty() {
        return Err(BackendError::malformed(backend, "empty reflection"));
    }

    Ok(Reflection {
        reflection: raw.reflection,
        summary: raw.summary,
        followups: raw.followups,
        tone: raw.tone,
        safety_flag: truthy(&raw.safety_flag),
    })
}
