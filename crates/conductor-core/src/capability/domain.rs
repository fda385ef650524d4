//! Helpers shared by the built-in capabilities.

use std::path::Path;

use conductor_types::JsonMap;
use conductor_types::error::CapabilityError;
use serde_json::{Value, json};

/// A `{path, content}` entry from a capability payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FileSpec {
    pub path: String,
    pub content: String,
}

/// Parse `files: [{path, content}]` from `payload`, skipping entries
/// without a path.
pub(crate) fn file_specs(payload: &JsonMap) -> Vec<FileSpec> {
    payload
        .get("files")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let path = item.get("path").and_then(Value::as_str)?;
                    if path.is_empty() {
                        return None;
                    }
                    Some(FileSpec {
                        path: path.to_string(),
                        content: item
                            .get("content")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The object under `key`, or `InvalidInput`.
pub(crate) fn object_field<'a>(input: &'a JsonMap, key: &str) -> Result<&'a JsonMap, CapabilityError> {
    input
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| CapabilityError::InvalidInput(format!("expected an object under '{key}'")))
}

/// `{status: error, error, reason?, details?}`
pub(crate) fn error_result(error: impl Into<String>, reason: Option<&str>, details: Option<String>) -> JsonMap {
    let mut result = JsonMap::new();
    result.insert("status".to_string(), json!("error"));
    result.insert("error".to_string(), Value::String(error.into()));
    if let Some(reason) = reason {
        result.insert("reason".to_string(), json!(reason));
    }
    if let Some(details) = details {
        result.insert("details".to_string(), Value::String(details));
    }
    result
}

/// Whether `result` is a `status: error` answer.
pub(crate) fn is_error(result: &JsonMap) -> bool {
    result.get("status").and_then(Value::as_str) == Some("error")
}

fn stem_and_ext(path: &str) -> (String, String) {
    let p = Path::new(path);
    let stem = p
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = p
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (stem, ext)
}

fn sibling(path: &str, file_name: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.join(file_name).to_string_lossy().into_owned()
        }
        _ => file_name.to_string(),
    }
}

/// Whether `path` names a test file (`X.test.ext` or `test_x.py`).
pub(crate) fn is_test_path(path: &str) -> bool {
    let name = Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.contains(".test.") || name.starts_with("test_")
}

/// Test file generated alongside `path`, if its language has one.
pub(crate) fn test_path_for(path: &str) -> Option<String> {
    if is_test_path(path) {
        return None;
    }
    let (stem, ext) = stem_and_ext(path);
    match ext.as_str() {
        "tsx" | "ts" | "jsx" | "js" => Some(sibling(path, &format!("{stem}.test.{ext}"))),
        "py" => Some(sibling(path, &format!("test_{stem}.py"))),
        _ => None,
    }
}

/// Skeleton test content for `path`.
pub(crate) fn test_content_for(path: &str) -> String {
    let (stem, ext) = stem_and_ext(path);
    match ext.as_str() {
        "tsx" | "jsx" => format!(
            "import {{ render, screen }} from '@testing-library/react'\n\
             import {{ {stem} }} from './{stem}'\n\
             \n\
             describe('{stem}', () => {{\n\
             \x20   it('renders correctly', () => {{\n\
             \x20       render(<{stem} />)\n\
             \x20   }})\n\
             }})\n"
        ),
        "ts" | "js" => format!(
            "import {{ {stem} }} from './{stem}'\n\
             \n\
             describe('{stem}', () => {{\n\
             \x20   it('works correctly', () => {{\n\
             \x20   }})\n\
             }})\n"
        ),
        "py" => format!(
            "import unittest\n\
             from {stem} import *\n\
             \n\
             \n\
             class Test{class_name}(unittest.TestCase):\n\
             \x20   def test_functionality(self):\n\
             \x20       pass\n\
             \n\
             \n\
             if __name__ == '__main__':\n\
             \x20   unittest.main()\n",
            class_name = title_case(&stem)
        ),
        _ => String::new(),
    }
}

fn title_case(stem: &str) -> String {
    stem.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Naming issues and content suggestions specific to a domain.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct DomainCheck {
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

impl DomainCheck {
    pub(crate) fn to_value(&self) -> Value {
        json!({
            "status": if self.issues.is_empty() { "valid" } else { "invalid" },
            "issues": self.issues,
            "suggestions": self.suggestions,
        })
    }
}

/// Domain conventions for the `frontend` and `backend` domains. Other
/// domains have no specific checks.
pub(crate) fn check_domain_conventions(domain: &str, path: &str, content: &str) -> DomainCheck {
    let mut check = DomainCheck::default();
    let (stem, ext) = stem_and_ext(path);
    let first = stem.chars().next();

    match domain {
        "frontend" => {
            let upper = first.is_some_and(char::is_uppercase);
            if !upper && matches!(ext.as_str(), "tsx" | "jsx") {
                check.issues.push("Component files should use PascalCase".to_string());
            } else if upper && matches!(ext.as_str(), "ts" | "js") {
                check.issues.push("Utility files should use camelCase".to_string());
            }
            if content.contains("class ") && !content.contains("React.Component") {
                check
                    .suggestions
                    .push("Consider using functional components instead of classes".to_string());
            }
            if content.contains("var ") {
                check
                    .suggestions
                    .push("Use const or let instead of var".to_string());
            }
        }
        "backend" => {
            if first.is_some_and(char::is_uppercase) && !stem.chars().skip(1).any(char::is_uppercase) {
                check.issues.push("Python files should use snake_case".to_string());
            }
            if content.contains("print(") {
                check
                    .suggestions
                    .push("Consider using logging instead of print statements".to_string());
            }
            if content.contains("except:") {
                check.suggestions.push("Avoid bare except clauses".to_string());
            }
        }
        _ => {}
    }
    check
}
