//! Error types for taped-sb
//!
//! Every fatal error names the pipeline stage that failed and, where one is
//! involved, the clip or artifact it failed on.

use std::fmt;
use std::path::PathBuf;
use taped_common::ClipIdentity;
use thiserror::Error;

/// Pipeline stage an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovery,
    Normalize,
    Measure,
    PadTrim,
    Verify,
    Concat,
    Manifest,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovery => "discovery",
            Stage::Normalize => "normalize",
            Stage::Measure => "measure",
            Stage::PadTrim => "pad/trim",
            Stage::Verify => "verify",
            Stage::Concat => "concat",
            Stage::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

/// Main error type for taped-sb
#[derive(Error, Debug)]
pub enum SpriteError {
    /// Input root does not exist
    #[error("Input directory not found: {0}")]
    PathNotFound(PathBuf),

    /// Input root exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Traversal failure (unreadable entry, symlink loop, bad file name)
    #[error("[discovery] {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    /// Two source files map to the same sprite key
    #[error("[discovery] clips {first} and {second} share identity '{identity}'")]
    DuplicateIdentity {
        identity: ClipIdentity,
        first: PathBuf,
        second: PathBuf,
    },

    /// Engine executable could not be started
    #[error("[{stage}] audio engine '{binary}' not found")]
    EngineNotFound { stage: Stage, binary: String },

    /// Engine ran but failed or produced unusable output
    #[error("[{stage}] {target}: {message}")]
    Engine {
        stage: Stage,
        target: String,
        message: String,
    },

    /// Final clip artifact does not have its quantized duration
    #[error("[verify] {identity}: expected {expected_ms}ms, measured {actual_ms}ms")]
    DurationMismatch {
        identity: ClipIdentity,
        expected_ms: u64,
        actual_ms: u64,
    },

    /// Combined sprite length disagrees with the manifest
    #[error("[concat] {path}: manifest covers {expected_ms}ms, sprite measures {actual_ms}ms")]
    SpriteDuration {
        path: PathBuf,
        expected_ms: u64,
        actual_ms: u64,
    },

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// taped-common error
    #[error(transparent)]
    Common(#[from] taped_common::Error),
}

impl SpriteError {
    /// Engine failure on a clip or artifact
    pub fn engine(stage: Stage, target: impl fmt::Display, message: impl Into<String>) -> Self {
        SpriteError::Engine {
            stage,
            target: target.to_string(),
            message: message.into(),
        }
    }

    /// Re-attribute an engine failure to a clip identity instead of a file
    pub fn for_clip(self, identity: &ClipIdentity) -> Self {
        match self {
            SpriteError::Engine { stage, message, .. } => SpriteError::Engine {
                stage,
                target: identity.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Stage the error belongs to, if it is stage-specific
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SpriteError::PathNotFound(_)
            | SpriteError::NotADirectory(_)
            | SpriteError::Discovery { .. }
            | SpriteError::DuplicateIdentity { .. } => Some(Stage::Discovery),
            SpriteError::EngineNotFound { stage, .. } | SpriteError::Engine { stage, .. } => {
                Some(*stage)
            }
            SpriteError::DurationMismatch { .. } => Some(Stage::Verify),
            SpriteError::SpriteDuration { .. } => Some(Stage::Concat),
            SpriteError::Io(_) | SpriteError::Common(_) => None,
        }
    }
}

/// Convenience Result type using SpriteError
pub type Result<T> = std::result::Result<T, SpriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_stage_and_clip() {
        let err = SpriteError::engine(Stage::PadTrim, "sfx/boom", "sox exited with 2");
        assert_eq!(err.to_string(), "[pad/trim] sfx/boom: sox exited with 2");
        assert_eq!(err.stage(), Some(Stage::PadTrim));

        let err = SpriteError::DurationMismatch {
            identity: ClipIdentity::parse("ui/click").unwrap(),
            expected_ms: 300,
            actual_ms: 299,
        };
        assert_eq!(err.to_string(), "[verify] ui/click: expected 300ms, measured 299ms");
        assert_eq!(err.stage(), Some(Stage::Verify));
    }

    #[test]
    fn test_engine_not_found_message() {
        let err = SpriteError::EngineNotFound {
            stage: Stage::Normalize,
            binary: "sox".to_string(),
        };
        assert_eq!(err.to_string(), "[normalize] audio engine 'sox' not found");
    }
}
