//! MCP server for the Khipu payment API.
//!
//! Serves over stdio:
//! - documentation tools backed by [`khipu_openapi_nav::SpecNavigator`] (always registered)
//! - payment API tools backed by [`khipu_api_client::ApiClient`] (only with an API key)

pub mod api_tools;
pub mod config;
pub mod doc_tools;
pub mod error;
pub mod logging;
pub mod service;
pub mod validation;

pub use config::{Args, LogFormat};
pub use error::{Result, ServerError};
pub use service::KhipuMcpService;

use khipu_api_client::ApiClient;
use khipu_openapi_nav::SpecNavigator;
use rmcp::ServiceExt as _;
use rmcp::transport::stdio;
use std::sync::Arc;

/// Load the spec and build the service. A spec that cannot be loaded is fatal.
///
/// # Errors
///
/// Returns an error if the spec fails to load or the API client config is invalid.
pub fn build_service(args: &Args) -> Result<KhipuMcpService> {
    let navigator = SpecNavigator::load(&args.spec_source())?;
    let api = args
        .api_client_config()?
        .map(ApiClient::new)
        .transpose()?;

    if api.is_none() {
        tracing::info!("no API key configured; payment API tools disabled");
    }
    Ok(KhipuMcpService::new(Arc::new(navigator), api))
}

/// Serve MCP over stdin/stdout until the client disconnects.
///
/// # Errors
///
/// Returns an error if startup fails or the transport terminates abnormally.
pub async fn run(args: Args) -> Result<()> {
    let service = build_service(&args)?;
    tracing::info!(
        spec = %args.spec,
        tools = service.tool_names().len(),
        api_enabled = service.api_enabled(),
        "starting khipu-mcp on stdio"
    );

    let server = service
        .serve(stdio())
        .await
        .map_err(|e| ServerError::Runtime(format!("MCP initialize failed: {e}")))?;
    let reason = server
        .waiting()
        .await
        .map_err(|e| ServerError::Runtime(e.to_string()))?;

    tracing::info!(?reason, "khipu-mcp stopped");
    Ok(())
}
