use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// An external collaborator failed; the commit analysis cannot continue.
    #[error(transparent)]
    Collaborator(#[from] storyline_syntax::CollaboratorError),

    #[error("export serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
