//! Error types for the khipu-mcp server.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// Spec could not be loaded (missing file, parse failure, pinned hash mismatch).
    #[error("Spec error: {0}")]
    Spec(#[from] khipu_openapi_nav::SpecNavError),

    /// Payment API client could not be configured.
    #[error("API client error: {0}")]
    ApiClient(#[from] khipu_api_client::ApiClientError),

    /// Invalid CLI/env configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),

    /// MCP transport failed.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
