//! Generation errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Broad class of a failure, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Description parsing or constant loading failed.
    Input,
    /// The compiler rejected the descriptions for a target.
    Compile,
    /// A symbol is unsupported on every target of an OS.
    Consistency,
    /// Formatting or filesystem failure while writing artifacts.
    Output,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Input => "input",
            ErrorKind::Compile => "compile",
            ErrorKind::Consistency => "consistency",
            ErrorKind::Output => "output",
        })
    }
}

/// Errors that stop a generation run.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("failed to parse descriptions for {os} ({count} errors)")]
    Parse { os: String, count: usize },

    #[error("generation failed for {os}: {} ({kind} errors)", targets.join(", "))]
    TargetsFailed {
        os: String,
        targets: Vec<String>,
        kind: ErrorKind,
    },

    #[error("{symbol} is unsupported on all arches (typo?)")]
    Unsupported { os: String, symbol: String },

    #[error("failed to format output for {}: {source}", path.display())]
    Format {
        path: PathBuf,
        /// The unformatted text, kept for diagnosis.
        raw: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize {table}: {source}")]
    Serialize {
        table: String,
        source: serde_json::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read output file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write output file {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("console output failed: {0}")]
    Console(#[from] std::io::Error),
}

impl GenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenError::Parse { .. } => ErrorKind::Input,
            GenError::TargetsFailed { kind, .. } => *kind,
            GenError::Unsupported { .. } => ErrorKind::Consistency,
            GenError::Format { .. }
            | GenError::Serialize { .. }
            | GenError::CreateDir { .. }
            | GenError::ReadFile { .. }
            | GenError::WriteFile { .. }
            | GenError::Console(_) => ErrorKind::Output,
        }
    }
}

/// Result type alias for generation.
pub type Result<T> = std::result::Result<T, GenError>;
