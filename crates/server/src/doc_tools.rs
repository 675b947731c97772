//! Documentation tools backed by the spec navigator.
//!
//! Successful payloads are pretty-printed JSON text. Not-found lookups are ordinary (non-error)
//! results listing the valid alternatives.

use crate::service::KhipuMcpService;
use khipu_openapi_nav::EndpointSelector;
use khipu_openapi_nav::navigator::to_pretty_json;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::{ErrorData as McpError, tool, tool_router};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetEndpointRequest {
    /// The operationId of the endpoint, e.g. 'postPayment'
    pub operation_id: Option<String>,
    /// The path of the endpoint, e.g. '/v3/payments'
    pub path: Option<String>,
    /// The HTTP method, e.g. 'post', 'get', 'delete'
    pub method: Option<String>,
}

impl From<GetEndpointRequest> for EndpointSelector {
    fn from(req: GetEndpointRequest) -> Self {
        Self {
            operation_id: req.operation_id,
            path: req.path,
            method: req.method,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetSchemaRequest {
    /// Schema name, e.g. 'payment-post-payment'
    pub name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchDocsRequest {
    /// Text to search for in the API specification
    pub query: String,
}

fn text(body: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(body)]))
}

impl KhipuMcpService {
    pub(crate) fn doc_tools() -> ToolRouter<Self> {
        Self::doc_tool_router()
    }
}

#[tool_router(router = doc_tool_router)]
impl KhipuMcpService {
    #[tool(
        name = "khipu_get_overview",
        description = "Get an overview of the Khipu API: description, base URL, authentication method, and list of available endpoints",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    pub async fn get_overview(&self) -> Result<CallToolResult, McpError> {
        text(to_pretty_json(&self.navigator.overview()))
    }

    #[tool(
        name = "khipu_list_endpoints",
        description = "List all Khipu API endpoints with their HTTP method, path, operationId, and summary",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    pub async fn list_endpoints(&self) -> Result<CallToolResult, McpError> {
        text(to_pretty_json(&self.navigator.list_endpoints()))
    }

    #[tool(
        name = "khipu_get_endpoint",
        description = "Get full details for a specific Khipu API endpoint: parameters, request body schema, response schemas. Provide either operationId (e.g. 'postPayment') or path+method (e.g. '/v3/payments' + 'post')",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    pub async fn get_endpoint(
        &self,
        Parameters(request): Parameters<GetEndpointRequest>,
    ) -> Result<CallToolResult, McpError> {
        let selector = EndpointSelector::from(request);
        let lookup = self.navigator.get_endpoint(&selector);
        tracing::debug!(?selector, found = lookup.is_found(), "get_endpoint");
        text(lookup.render())
    }

    #[tool(
        name = "khipu_get_schema",
        description = "Get the definition of a specific Khipu API schema by name (e.g. 'payment-post-payment', 'bank-get-banks', 'success')",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    pub async fn get_schema(
        &self,
        Parameters(GetSchemaRequest { name }): Parameters<GetSchemaRequest>,
    ) -> Result<CallToolResult, McpError> {
        let lookup = self.navigator.get_schema(&name);
        tracing::debug!(name = %name, found = lookup.is_found(), "get_schema");
        text(lookup.render())
    }

    #[tool(
        name = "khipu_search_docs",
        description = "Search for a keyword or phrase across the entire Khipu API specification. Returns matching paths, operations, and schema names.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    pub async fn search_docs(
        &self,
        Parameters(SearchDocsRequest { query }): Parameters<SearchDocsRequest>,
    ) -> Result<CallToolResult, McpError> {
        text(to_pretty_json(&self.navigator.search_docs(&query)))
    }
}
