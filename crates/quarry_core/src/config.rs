//! Index configuration.

use crate::error::IndexResult;
use crate::key::PartitionerKind;
use crate::mapper::IndexSchemaOptions;
use serde::{Deserialize, Serialize};

/// When the writer reads stored rows before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadBeforeWrite {
    /// Only when the pending image cannot settle liveness or content.
    #[default]
    Auto,
    /// On every key.
    Always,
}

/// Runtime configuration of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Partitioner the table's keys are decorated with.
    pub partitioner: PartitionerKind,

    /// Read-before-write policy.
    pub read_before_write: ReadBeforeWrite,

    /// Upper bound on hits returned by one search.
    pub max_search_results: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            partitioner: PartitionerKind::Hash,
            read_before_write: ReadBeforeWrite::Auto,
            max_search_results: 10_000,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the partitioner.
    #[must_use]
    pub const fn partitioner(mut self, kind: PartitionerKind) -> Self {
        self.partitioner = kind;
        self
    }

    /// Sets the read-before-write policy.
    #[must_use]
    pub const fn read_before_write(mut self, policy: ReadBeforeWrite) -> Self {
        self.read_before_write = policy;
        self
    }

    /// Sets the search result bound.
    #[must_use]
    pub const fn max_search_results(mut self, limit: usize) -> Self {
        self.max_search_results = limit;
        self
    }
}

/// Index options as declared on the table, in JSON.
///
/// ```
/// use quarry_core::IndexOptions;
///
/// let options = IndexOptions::from_json(
///     r#"{"partitioner": "ordered", "schema": {"fields": {"name": {"type": "string"}}}}"#,
/// )
/// .unwrap();
/// assert_eq!(options.schema.fields.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Partitioner choice.
    pub partitioner: PartitionerKind,
    /// Read-before-write policy.
    pub read_before_write: ReadBeforeWrite,
    /// Search result bound; the default applies when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_search_results: Option<usize>,
    /// Field mappers and analyzers.
    pub schema: IndexSchemaOptions,
}

impl IndexOptions {
    /// Parses options from JSON.
    ///
    /// # Errors
    ///
    /// Returns an invalid schema error for malformed JSON.
    pub fn from_json(json: &str) -> IndexResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the runtime configuration part.
    pub fn config(&self) -> IndexConfig {
        let config = IndexConfig::new()
            .partitioner(self.partitioner)
            .read_before_write(self.read_before_write);
        match self.max_search_results {
            Some(limit) => config.max_search_results(limit),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;

    #[test]
    fn default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.partitioner, PartitionerKind::Hash);
        assert_eq!(config.read_before_write, ReadBeforeWrite::Auto);
        assert_eq!(config.max_search_results, 10_000);
    }

    #[test]
    fn builder_pattern() {
        let config = IndexConfig::new()
            .partitioner(PartitionerKind::Ordered)
            .read_before_write(ReadBeforeWrite::Always)
            .max_search_results(5);
        assert_eq!(config.partitioner, PartitionerKind::Ordered);
        assert_eq!(config.read_before_write, ReadBeforeWrite::Always);
        assert_eq!(config.max_search_results, 5);
    }

    #[test]
    fn options_from_json() {
        let options = IndexOptions::from_json(
            r#"{"read_before_write": "always", "max_search_results": 7}"#,
        )
        .unwrap();
        let config = options.config();
        assert_eq!(config.read_before_write, ReadBeforeWrite::Always);
        assert_eq!(config.max_search_results, 7);
        assert_eq!(config.partitioner, PartitionerKind::Hash);
    }

    #[test]
    fn empty_options_use_defaults() {
        let options = IndexOptions::from_json("{}").unwrap();
        assert_eq!(options.config(), IndexConfig::default());
    }

    #[test]
    fn malformed_options_rejected() {
        let err = IndexOptions::from_json(r#"{"partitioner": "random"}"#).unwrap_err();
        assert!(matches!(err, IndexError::InvalidSchema { .. }));
    }
}
