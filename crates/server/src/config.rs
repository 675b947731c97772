//! Command-line / environment configuration.

use crate::error::{Result, ServerError};
use clap::{Parser, ValueEnum};
use khipu_api_client::{ApiClientConfig, DEFAULT_BASE_URL};
use khipu_openapi_nav::{HashPolicy, SpecSource};
use std::time::Duration;

/// Upper bound on payment API response bodies.
pub const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "khipu-mcp",
    version,
    about = "MCP server for navigating the Khipu API specification and calling the payment API"
)]
pub struct Args {
    /// OpenAPI document to serve (JSON or YAML).
    #[arg(long, env = "KHIPU_OPENAPI_SPEC", default_value = "openapi.json")]
    pub spec: String,

    /// Expected content hash of the spec (`sha256:<hex>`).
    #[arg(long, env = "KHIPU_OPENAPI_SPEC_HASH")]
    pub spec_hash: Option<String>,

    /// What to do when `--spec-hash` does not match: warn, fail or ignore.
    #[arg(long, env = "KHIPU_OPENAPI_SPEC_HASH_POLICY", default_value = "warn")]
    pub spec_hash_policy: HashPolicy,

    /// Merchant API key. Payment API tools are only registered when set.
    #[arg(long, env = "KHIPU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Payment API base URL.
    #[arg(long, env = "KHIPU_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout for payment API calls (0 disables it).
    #[arg(long, env = "KHIPU_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log filter (`info`, `debug`, `khipu_openapi_nav=trace`, ...).
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, env = "KHIPU_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    #[must_use]
    pub fn spec_source(&self) -> SpecSource {
        SpecSource {
            spec: self.spec.clone(),
            spec_hash: self.spec_hash.clone(),
            spec_hash_policy: self.spec_hash_policy,
        }
    }

    /// Client config when an API key is present. A blank key counts as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty.
    pub fn api_client_config(&self) -> Result<Option<ApiClientConfig>> {
        let Some(api_key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        if self.base_url.trim().is_empty() {
            return Err(ServerError::Config("--base-url must not be empty".to_string()));
        }
        Ok(Some(ApiClientConfig {
            base_url: self.base_url.trim().to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_response_bytes: Some(MAX_RESPONSE_BYTES),
        }))
    }
}
