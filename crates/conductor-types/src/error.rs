use thiserror::Error;

/// Errors raised by a capability's `process` call.
///
/// The engine converts every variant into an `Error` outcome; none of them
/// propagate out of a workflow run.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("file error: {0}")]
    File(#[from] FileError),

    #[error("capability panicked: {0}")]
    Panicked(String),
}

/// Errors from the file-content port.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("io error on {path}: {message}")]
    Io { path: String, message: String },
}

impl FileError {
    /// Map an `io::Error` for `path`, keeping `NotFound` distinct.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        let path = path.display().to_string();
        if err.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(path)
        } else {
            FileError::Io {
                path,
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let mapped = FileError::from_io(Path::new("src/a.tsx"), err);
        assert!(matches!(mapped, FileError::NotFound(ref p) if p == "src/a.tsx"));
    }

    #[test]
    fn test_from_io_keeps_message() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let mapped = FileError::from_io(Path::new("x.py"), err);
        assert_eq!(mapped.to_string(), "io error on x.py: denied");
    }

    #[test]
    fn test_failed_displays_message_verbatim() {
        assert_eq!(CapabilityError::Failed("disk full".into()).to_string(), "disk full");
    }
}
