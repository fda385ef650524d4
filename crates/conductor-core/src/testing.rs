//! Test doubles shared by the core test modules.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use conductor_types::JsonMap;
use conductor_types::error::{CapabilityError, FileError};
use serde_json::Value;

use crate::capability::Capability;
use crate::fs::FileSystem;

/// Build a `JsonMap` from a `json!({...})` object literal.
pub(crate) fn map(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// MemoryFileSystem
// ---------------------------------------------------------------------------

/// In-memory `FileSystem` with injectable read failures.
#[derive(Default)]
pub(crate) struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    broken: Mutex<HashSet<PathBuf>>,
    reads: Mutex<Vec<PathBuf>>,
}

impl MemoryFileSystem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
        self
    }

    /// Reads of `path` fail with an IO error.
    pub(crate) fn with_broken(self, path: &str) -> Self {
        self.broken.lock().unwrap().insert(PathBuf::from(path));
        self
    }

    pub(crate) fn content(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .map(|p| p.display().to_string())
            .collect();
        paths.sort();
        paths
    }

    pub(crate) fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }
}

impl FileSystem for MemoryFileSystem {
    async fn read_file(&self, path: &Path) -> Result<String, FileError> {
        self.reads.lock().unwrap().push(path.to_path_buf());
        if self.broken.lock().unwrap().contains(path) {
            return Err(FileError::Io {
                path: path.display().to_string(),
                message: "permission denied".to_string(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FileError::NotFound(path.display().to_string()))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), FileError> {
        if self.broken.lock().unwrap().contains(path) {
            return Err(FileError::Io {
                path: path.display().to_string(),
                message: "read-only".to_string(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    async fn file_size(&self, path: &Path) -> Result<u64, FileError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| FileError::NotFound(path.display().to_string()))
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, FileError> {
        let whole_tree = dir.as_os_str().is_empty() || dir == Path::new(".");
        let mut files: Vec<PathBuf> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|path| {
                if whole_tree {
                    Some(path.clone())
                } else {
                    path.strip_prefix(dir).ok().map(Path::to_path_buf)
                }
            })
            .collect();
        if files.is_empty() && !whole_tree {
            return Err(FileError::NotFound(dir.display().to_string()));
        }
        files.sort();
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// ScriptedCapability
// ---------------------------------------------------------------------------

/// One scripted answer.
pub(crate) enum Reply {
    Result(JsonMap),
    Fail(String),
    Panic(String),
}

/// Shared log of every input a scripted capability received.
pub(crate) type CallLog = Arc<Mutex<Vec<JsonMap>>>;

/// Capability that answers from a queue and records its inputs.
///
/// Once the queue is drained it answers `{"status": "success"}`.
pub(crate) struct ScriptedCapability {
    name: String,
    replies: Mutex<VecDeque<Reply>>,
    calls: CallLog,
}

impl ScriptedCapability {
    pub(crate) fn succeeding(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: Mutex::new(VecDeque::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn then(self, result: Value) -> Self {
        self.replies.lock().unwrap().push_back(Reply::Result(map(result)));
        self
    }

    pub(crate) fn then_fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Fail(message.to_string()));
        self
    }

    pub(crate) fn then_panic(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Panic(message.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> CallLog {
        Arc::clone(&self.calls)
    }
}

impl Capability for ScriptedCapability {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, input: JsonMap) -> Result<JsonMap, CapabilityError> {
        self.calls.lock().unwrap().push(input);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Result(result)) => Ok(result),
            Some(Reply::Fail(message)) => Err(CapabilityError::Failed(message)),
            Some(Reply::Panic(message)) => panic!("{message}"),
            None => Ok(map(serde_json::json!({ "status": "success" }))),
        }
    }
}
