//! Error types for discovery searches

use thiserror::Error;

/// Failures reported by a case store implementation.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The query could not be executed
    #[error("case store query failed: {0}")]
    Query(String),

    /// A referenced object does not exist
    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    /// A row was missing a column or held a value of the wrong type
    #[error("could not decode column {column}: {message}")]
    Decode {
        column: String,
        message: String,
    },

    /// Reading file content failed
    #[error("content read failed: {0}")]
    Content(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            identifier: identifier.into(),
        }
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// Failures reported by a central repository implementation.
#[derive(Error, Debug, Clone)]
pub enum CentralRepoError {
    /// Lookup query failed
    #[error("central repository query failed: {0}")]
    Query(String),

    /// One value could not be normalized for lookup. Callers skip the value.
    #[error("could not normalize {value:?}: {message}")]
    Normalization { value: String, message: String },

    /// The repository is configured but not reachable
    #[error("central repository unavailable: {0}")]
    Unavailable(String),
}

impl CentralRepoError {
    pub fn normalization(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Normalization {
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Errors that cross the discovery engine boundary.
///
/// `Cancelled` is kept apart from every other variant: it is never wrapped
/// and callers are expected to match on it to report a cancelled search
/// instead of a failure.
#[derive(Error, Debug, Clone)]
pub enum DiscoveryError {
    /// The search context was cancelled or the worker was interrupted
    #[error("search cancelled during {stage}")]
    Cancelled { stage: &'static str },

    /// Filter set cannot produce a case store query
    #[error("invalid filters: {0}")]
    InvalidFilters(String),

    /// A case store call failed
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    /// A central repository call failed
    #[error("{context}: {source}")]
    CentralRepo {
        context: String,
        #[source]
        source: CentralRepoError,
    },

    /// An operation that needs the central repository ran without one
    #[error("{context} requires a central repository")]
    MissingCentralRepository { context: &'static str },

    /// A result of the wrong kind reached a file- or domain-only attribute
    #[error("{attribute} expects a {expected} result, got {found}")]
    UnexpectedResultType {
        attribute: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// Result type alias for discovery operations
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

impl DiscoveryError {
    /// Wrap a store failure with the name of the active filter or attribute.
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    /// Wrap a central repository failure with the active filter or attribute.
    pub fn central_repo(context: impl Into<String>, source: CentralRepoError) -> Self {
        Self::CentralRepo {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_filters(message: impl Into<String>) -> Self {
        Self::InvalidFilters(message.into())
    }

    /// Returns `true` for the cancellation outcome.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns `true` if running the same search again may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled { .. }
                | Self::Store {
                    source: StoreError::Query(_),
                    ..
                }
                | Self::CentralRepo {
                    source: CentralRepoError::Unavailable(_) | CentralRepoError::Query(_),
                    ..
                }
        )
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => "SEARCH_CANCELLED",
            Self::InvalidFilters(_) => "INVALID_FILTERS",
            Self::Store { .. } => "CASE_STORE_ERROR",
            Self::CentralRepo { .. } => "CENTRAL_REPO_ERROR",
            Self::MissingCentralRepository { .. } => "CENTRAL_REPO_MISSING",
            Self::UnexpectedResultType { .. } => "UNEXPECTED_RESULT_TYPE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_distinguishable() {
        let cancelled = DiscoveryError::Cancelled { stage: "query" };
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.error_code(), "SEARCH_CANCELLED");

        let store = DiscoveryError::store("Size filter", StoreError::Query("boom".into()));
        assert!(!store.is_cancelled());
        assert!(store.is_retryable());
    }

    #[test]
    fn store_error_keeps_context_and_source() {
        let err = DiscoveryError::store(
            "keyword list enrichment",
            StoreError::decode("set_name", "null value"),
        );
        let text = err.to_string();
        assert!(text.starts_with("keyword list enrichment: "));
        assert!(text.contains("set_name"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn normalization_failure_message() {
        let err = CentralRepoError::normalization("bad..domain", "empty label");
        assert_eq!(
            err.to_string(),
            "could not normalize \"bad..domain\": empty label"
        );
    }
}
