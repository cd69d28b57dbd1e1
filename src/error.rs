use std::fmt::{Display, Formatter};

use thiserror::Error;

/// A single rejected command-line value, reported as `- field: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    pub fn new<M: Into<String>>(field: &'static str, message: M) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "- {}: {}", self.field, self.message)
    }
}

/// Newline-separated list of issues, so the whole batch prints in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssues(pub Vec<ValidationIssue>);

impl Display for ValidationIssues {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, issue) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Unified application error type to simplify bubbling errors through async flows.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation errors:\n{0}")]
    Validation(ValidationIssues),
    #[error("{0}")]
    Repository(String),
    #[error("Git command failed: {0}")]
    Git(#[from] git2::Error),
    #[error("Commit {0} not found")]
    CommitNotFound(String),
    #[error("Failed to get diff for file {path}: {message}")]
    DiffRetrieval { path: String, message: String },
    #[error("Failed to summarize commit {hash}: {message}")]
    Summarization { hash: String, message: String },
    #[error("Error communicating with the AI. {0}")]
    AIClient(#[from] async_openai::error::OpenAIError),
    #[error("Error serializing json. {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Errored while handling a file. {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date or timezone. {0}")]
    Date(#[from] jiff::Error),
    #[error("Commit timestamp out of range. {0}")]
    TimestampRange(#[from] time::error::ComponentRange),
    #[error("Unable to format commit timestamp. {0}")]
    TimestampFormat(#[from] time::error::Format),
    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        AppError::Validation(ValidationIssues(issues))
    }
}

/// Convenience alias for results that bubble `AppError`.
pub type AppResult<T> = Result<T, AppError>;
