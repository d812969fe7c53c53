//! Error types for the Quarry indexing write path.

use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur while mapping, assembling or writing documents.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Malformed or schema-mismatched partition or clustering key bytes.
    #[error("key decoding failed: {message}")]
    KeyDecoding {
        /// Description of the mismatch.
        message: String,
    },

    /// A cell's raw bytes do not match its declared type.
    #[error("column projection failed for {column}: {message}")]
    ColumnProjection {
        /// The offending column.
        column: String,
        /// Description of the failure.
        message: String,
    },

    /// A required source column is missing for a non-nullable mapper.
    #[error("mapper assembly failed for field {field}: {message}")]
    MapperAssembly {
        /// The field whose mapper rejected the row.
        field: String,
        /// Description of the failure.
        message: String,
    },

    /// The underlying index is unavailable or corrupt.
    #[error("index engine error: {message}")]
    EngineIo {
        /// Description of the failure.
        message: String,
    },

    /// Cell codec error.
    #[error("codec error: {0}")]
    Codec(#[from] quarry_codec::CodecError),

    /// Index options or schema are invalid.
    #[error("invalid index schema: {message}")]
    InvalidSchema {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl IndexError {
    /// Creates a key decoding error.
    pub fn key_decoding(message: impl Into<String>) -> Self {
        Self::KeyDecoding {
            message: message.into(),
        }
    }

    /// Creates a column projection error.
    pub fn column_projection(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ColumnProjection {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates a mapper assembly error.
    pub fn mapper_assembly(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MapperAssembly {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an engine I/O error.
    pub fn engine_io(message: impl Into<String>) -> Self {
        Self::EngineIo {
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error makes the whole index unusable.
    ///
    /// Every other kind is scoped to a single key or row.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EngineIo { .. })
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_schema(err.to_string())
    }
}
