//! Fatal-per-file build errors.
//!
//! Anything in here aborts compilation of the file that raised it. The batch
//! orchestrator catches these, logs them and marks the batch as failed so the
//! next watch tick escalates to a full rebuild.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("$IMPORT in `{file}`: unknown directive type `{kind}`")]
    UnknownDirective { file: String, kind: String },

    #[error("$IMPORT in `{file}`: missing required argument `{arg}`")]
    MissingArgument { file: String, arg: &'static str },

    #[error("$IMPORT in `{file}`: invalid arguments: {reason}")]
    InvalidArgument { file: String, reason: String },

    #[error("$IMPORT in `{file}`: `{path}` is not a directory")]
    NotADirectory { file: String, path: PathBuf },

    #[error("$IMPORT in `{file}`: `{path}` is outside the source root")]
    OutsideSourceRoot { file: String, path: String },

    #[error("$IMPORT in `{file}`: output_key `{key}` is not an array on the current layer")]
    OutputKeyMissing { file: String, key: String },

    #[error("$IMPORT in `{file}`: registry key `{key}` not found")]
    RegistryKeyMissing { file: String, key: String },

    #[error("import cycle: `{0}` is imported while it is still being compiled")]
    ImportCycle(String),

    #[error("$IMPORT in `{file}`: {reason}")]
    SpliceTarget { file: String, reason: String },

    #[error("IO error at `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{path}`: {reason}")]
    Parse { path: PathBuf, reason: String },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_build_error_display() {
        let err = BuildError::UnknownDirective {
            file: "actions/damage".into(),
            kind: "allOfIfThne".into(),
        };
        let display = err.to_string();
        assert!(display.contains("actions/damage"));
        assert!(display.contains("allOfIfThne"));

        let err = BuildError::io("schemas/a.yml", Error::new(ErrorKind::NotFound, "gone"));
        assert!(err.to_string().contains("schemas/a.yml"));
    }
}
