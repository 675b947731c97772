//! Error types for `khipu-openapi-nav`.
//!
//! Only loading can fail. Lookups that find nothing are reported as values (see
//! [`crate::navigator::EndpointLookup`] and [`crate::navigator::SchemaLookup`]) and dangling or
//! cyclic `$ref`s degrade to `null` in place.

use thiserror::Error;

/// Spec loading errors.
#[derive(Error, Debug)]
pub enum SpecNavError {
    /// The spec file could not be read (missing, unreadable).
    #[error("failed to read OpenAPI spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The spec content is neither valid JSON nor valid YAML.
    #[error("failed to parse OpenAPI spec from '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The spec parsed but does not have the shape of an API description.
    #[error("invalid OpenAPI spec '{location}': {message}")]
    InvalidDocument { location: String, message: String },

    /// Content hash verification failed under [`crate::config::HashPolicy::Fail`].
    #[error("spec hash mismatch for '{location}'. Expected: {expected}, Got: {actual}")]
    HashMismatch {
        location: String,
        expected: String,
        actual: String,
    },
}

/// Result type alias for spec loading.
pub type Result<T> = std::result::Result<T, SpecNavError>;
