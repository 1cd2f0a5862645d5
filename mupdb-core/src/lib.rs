//! Core data models and types for mupdb

pub mod error;
pub mod idgen;
pub mod types;

pub use error::*;
pub use idgen::*;
pub use types::*;

/// Result type alias for mupdb operations
pub type Result<T> = std::result::Result<T, MupdbError>;
