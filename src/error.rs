//! Error types for metric-index.

use thiserror::Error;

/// Errors that can occur while building or querying an index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Invalid construction parameter. Raised before any distance is computed.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// A query was issued before the index was built.
    #[error("index not built")]
    NotBuilt,

    /// `build` or `bulk_load` was called on an index that is already built.
    #[error("index already built; metric trees are bulk-loaded exactly once")]
    AlreadyBuilt,

    /// An identifier does not name an object of the relation.
    #[error("unknown object id {id}: relation has {len} objects")]
    UnknownId {
        /// The offending identifier.
        id: u32,
        /// Number of objects in the relation.
        len: usize,
    },
}

impl IndexError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        IndexError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_parameter() {
        let err = IndexError::invalid("expansion", "must be greater than 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter expansion: must be greater than 1"
        );

        let err = IndexError::UnknownId { id: 7, len: 3 };
        assert_eq!(err.to_string(), "unknown object id 7: relation has 3 objects");
    }
}
