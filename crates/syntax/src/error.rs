use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollaboratorError>;

/// Failure inside an external collaborator (span resolution, semantic model,
/// edit distance, description generation).
///
/// A collaborator returning an empty or `None` result is a resolution miss
/// and never surfaces as this error; an `Err` aborts the whole commit
/// analysis.
#[derive(Debug, Error)]
#[error("collaborator failure: {message}")]
pub struct CollaboratorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
