use thiserror::Error;

/// Errors surfaced by session and collaborator operations.
///
/// `NotFound` is kept distinct from `Upstream` so callers can tell a bad
/// reference apart from a transient collaborator failure. An unrecognized
/// voice command is not an error and never reaches this type.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("a recipe transform is already in progress for this session")]
    TransformBusy,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// True for failures that should be spoken as a transform apology rather
    /// than propagated: the optimizer being unreachable, returning garbage,
    /// or already working on this session.
    pub fn is_transform_failure(&self) -> bool {
        matches!(self, CoreError::Upstream(_) | CoreError::TransformBusy)
    }
}
