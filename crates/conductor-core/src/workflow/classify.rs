//! Result classification.
//!
//! Maps a raw capability result onto continue-or-halt using the reserved
//! `status`, `error`, `reason` and `issues` keys.

use conductor_types::JsonMap;
use conductor_types::outcome::HaltCause;
use serde_json::Value;

/// Structured `reason` codes that turn an error into a rejection.
pub const REJECTION_REASONS: [&str; 2] = ["naming_convention", "file_path"];

/// Error-text fragments that mark a rejection when no `reason` is given.
const REJECTION_PHRASES: [&str; 2] = ["naming convention", "file path"];

/// What the engine does with a step result.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Record the step and continue.
    Proceed,
    /// Halt with a `ReviewFailed` outcome.
    Reject {
        feedback: Vec<Value>,
        cause: HaltCause,
    },
    /// Halt with an `Error` outcome.
    Fail { details: String, cause: HaltCause },
}

/// Classify a capability result.
///
/// - `status == "error"` with a rejection reason (structured `reason` code,
///   or an `error` text mentioning a naming convention or file path) is a
///   rejection; any other error fails the step.
/// - `status == "failed"` is a rejection with `issues` as feedback.
/// - Any other status, or none, proceeds.
pub fn classify(result: &JsonMap) -> Classification {
    match result.get("status").and_then(Value::as_str) {
        Some("error") => {
            let error = result.get("error").cloned().unwrap_or(Value::Null);
            if is_rejection(result, &error) {
                Classification::Reject {
                    feedback: vec![error],
                    cause: HaltCause::AgentRejected,
                }
            } else {
                Classification::Fail {
                    details: error_text(&error),
                    cause: HaltCause::AgentError,
                }
            }
        }
        Some("failed") => Classification::Reject {
            feedback: feedback_list(result.get("issues")),
            cause: HaltCause::ValidationFailed,
        },
        _ => Classification::Proceed,
    }
}

fn is_rejection(result: &JsonMap, error: &Value) -> bool {
    if let Some(reason) = result.get("reason").and_then(Value::as_str) {
        if REJECTION_REASONS.contains(&reason) {
            return true;
        }
    }
    let text = error_text(error).to_lowercase();
    REJECTION_PHRASES.iter().any(|phrase| text.contains(phrase))
}

/// Render an `error` value as a message.
pub(crate) fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Normalize an `issues`/`suggestions` value into a list.
pub(crate) fn feedback_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}
