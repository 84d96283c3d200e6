use thiserror::Error;

/// Classified failure, carried as the root cause of an `anyhow::Error`.
#[derive(Debug, Error)]
pub enum DenverError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    Unrecoverable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    Transport,
    Malformed,
    Unrecoverable,
}

impl DenverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Malformed(_) => ErrorKind::Malformed,
            Self::Unrecoverable(_) => ErrorKind::Unrecoverable,
        }
    }
}

/// Finds the first classified cause in the error chain, if any.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<DenverError>())
        .map(DenverError::kind)
}
