//! Error types for the idea-generation pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymposiumError {
    #[error("OpenAI API error: {0}")]
    OpenAIError(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Malformed model output ({reason}): {text:?}")]
    MalformedOutput { reason: String, text: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Persona pool generation returned no personas")]
    EmptyPersonaPool,

    #[error("Expected prior-stage artifact missing: {0}")]
    MissingArtifact(String),

    #[error("Precision level must be greater than zero")]
    InvalidPrecisionLevel,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SymposiumError {
    /// Wrap an unparseable model reply, keeping the offending text for diagnosis.
    pub fn malformed(reason: impl Into<String>, text: impl Into<String>) -> Self {
        SymposiumError::MalformedOutput {
            reason: reason.into(),
            text: text.into(),
        }
    }
}
