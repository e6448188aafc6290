//! Error types for stream source operations

/// Result type for stream source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors raised by sources, the registry and the stream cache
///
/// A source that merely does not apply to a resource answers `Ok(None)`;
/// these variants are for everything else.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A default trait method was called on a source that does not override it.
    /// Callers are expected to check capabilities first, so this is a programming error.
    #[error("Operation '{operation}' is not supported by source '{source_id}'")]
    NotSupported {
        source_id: String,
        operation: &'static str,
    },

    #[error("Source '{0}' is already registered")]
    DuplicateSource(String),

    #[error("Source '{source_id}' failed to load: {reason}")]
    Load { source_id: String, reason: String },

    /// The source tried and definitively failed (e.g. no video matches a catalog track)
    #[error("No match found: {0}")]
    NoMatch(String),

    #[error("Stream unreachable: {0}")]
    Unreachable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resolution aborted: {0}")]
    Aborted(String),
}

impl SourceError {
    pub fn not_supported(source_id: impl Into<String>, operation: &'static str) -> Self {
        Self::NotSupported {
            source_id: source_id.into(),
            operation,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// True for the programmer-error condition raised by default trait methods
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Owned copy of an error shared between several callers
    ///
    /// Transport errors cannot be cloned and are carried over as text.
    pub fn replicate(&self) -> Self {
        match self {
            Self::NotSupported {
                source_id,
                operation,
            } => Self::NotSupported {
                source_id: source_id.clone(),
                operation,
            },
            Self::DuplicateSource(id) => Self::DuplicateSource(id.clone()),
            Self::Load { source_id, reason } => Self::Load {
                source_id: source_id.clone(),
                reason: reason.clone(),
            },
            Self::NoMatch(m) => Self::NoMatch(m.clone()),
            Self::Unreachable(m) => Self::Unreachable(m.clone()),
            Self::Storage(m) => Self::Storage(m.clone()),
            Self::Provider(m) => Self::Provider(m.clone()),
            Self::Http(e) => Self::Provider(e.to_string()),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Aborted(m) => Self::Aborted(m.clone()),
        }
    }
}
