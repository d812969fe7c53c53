//! # Quarry Testkit
//!
//! Test utilities for Quarry.
//!
//! This crate provides:
//! - A versioned in-memory table standing in for the storage engine
//! - A recording index backend with failure injection
//! - Table, row and index fixtures
//! - Property-based test generators using proptest
//! - Test log setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quarry_testkit::prelude::*;
//!
//! #[test]
//! fn indexes_a_row() {
//!     let index = TestIndex::new(skinny_table(), r#"{"fields": {"a": {"type": "integer"}}}"#);
//!     let key = index.key("k1");
//!     index.update(&key, vec![Mutation::Row(skinny_row(1, "n", 1))]).unwrap();
//!     assert_eq!(index.num_docs().unwrap(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod memory_table;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::memory_table::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use memory_table::*;
pub use recording::*;
