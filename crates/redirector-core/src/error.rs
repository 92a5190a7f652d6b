use crate::link::Span;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure reported by a host collaborator (store, link index, resolver or
/// link text generator).
///
/// The host decides whether a failure only affects the document being
/// processed or leaves the whole store unusable.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("{operation} failed: {source:#}")]
    Failed {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("document store unusable: {0:#}")]
    StoreUnusable(#[source] anyhow::Error),
}

impl HostError {
    pub fn failed(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        HostError::Failed {
            operation,
            source: source.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, HostError::StoreUnusable(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two pending rewrites in one document overlap. The document is left untouched.
    #[error("conflicting link spans in {path}: {first} overlaps {second}")]
    ConflictingSpans {
        path: String,
        first: Span,
        second: Span,
    },

    #[error(transparent)]
    Host(#[from] HostError),

    /// The store could not list its documents, so no batch can run.
    #[error("failed to enumerate documents: {0}")]
    Enumerate(#[source] HostError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the batch may continue with the next document after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::ConflictingSpans { .. } => true,
            Error::Host(e) => !e.is_fatal(),
            Error::Enumerate(_) | Error::InvalidConfig(_) => false,
        }
    }
}
