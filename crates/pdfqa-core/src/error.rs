use thiserror::Error;

/// Faults that abort an analysis run.
///
/// Findings (overflow, broken links) are never errors; they are collected
/// as [`crate::Issue`] records. Only structural problems with the input or
/// the configuration end up here.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<lopdf::Error> for AnalyzerError {
    fn from(e: lopdf::Error) -> Self {
        AnalyzerError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
