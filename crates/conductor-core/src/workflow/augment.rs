//! Step-input augmentation for review and fix-verification actions.
//!
//! Code-review steps receive a `code` field with the contents of every file
//! in `state.files`; fix-verification steps receive a `fix` field describing
//! the patched files. Unreadable files are listed, never fatal.

use std::path::Path;

use conductor_types::JsonMap;
use serde_json::{Value, json};

use crate::fs::FileSystem;

use super::state::ExecutionState;

/// Which derived field a step receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Augmentation {
    /// Attach `code = {files: [{path, content}], unreadable?}`.
    CodeReview,
    /// Attach `fix = {files, update_tests, contents, unreadable?}`.
    FixVerification,
}

/// File contents gathered through the `FileSystem` port.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileContents {
    /// `{path, content}` for each readable file, in request order.
    pub files: Vec<Value>,
    /// `{path, error}` for each file that could not be read.
    pub unreadable: Vec<Value>,
}

impl FileContents {
    /// Build the `{files, unreadable?}` object sent to a reviewer.
    pub fn into_code_value(self) -> Value {
        let mut code = JsonMap::new();
        code.insert("files".to_string(), Value::Array(self.files));
        if !self.unreadable.is_empty() {
            code.insert("unreadable".to_string(), Value::Array(self.unreadable));
        }
        Value::Object(code)
    }
}

/// Read every path, recording failures instead of returning them.
pub async fn read_contents<F: FileSystem>(fs: &F, paths: &[String]) -> FileContents {
    let mut contents = FileContents::default();
    for path in paths {
        match fs.read_file(Path::new(path)).await {
            Ok(content) => contents.files.push(json!({ "path": path, "content": content })),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "failed to read file for review");
                contents
                    .unreadable
                    .push(json!({ "path": path, "error": e.to_string() }));
            }
        }
    }
    contents
}

/// Attach the derived field for `kind` to `input`.
pub async fn apply<F: FileSystem>(
    fs: &F,
    kind: Augmentation,
    state: &ExecutionState,
    input: &mut JsonMap,
) {
    let paths = state.paths("files");
    let contents = read_contents(fs, &paths).await;
    match kind {
        Augmentation::CodeReview => {
            input.insert("code".to_string(), contents.into_code_value());
        }
        Augmentation::FixVerification => {
            let update_tests = state
                .get("issue")
                .and_then(|issue| issue.get("update_tests"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let mut fix = JsonMap::new();
            fix.insert(
                "files".to_string(),
                state.get("files").cloned().unwrap_or_else(|| json!([])),
            );
            fix.insert("update_tests".to_string(), Value::Bool(update_tests));
            fix.insert("contents".to_string(), Value::Array(contents.files));
            if !contents.unreadable.is_empty() {
                fix.insert("unreadable".to_string(), Value::Array(contents.unreadable));
            }
            input.insert("fix".to_string(), Value::Object(fix));
        }
    }
}
