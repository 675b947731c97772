//! MCP service: routes tool calls to the spec navigator and the payment API client.

use khipu_api_client::ApiClient;
use khipu_openapi_nav::SpecNavigator;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ServerHandler, tool_handler};
use std::sync::Arc;

const DOC_INSTRUCTIONS: &str = "Khipu API documentation tools. Start with khipu_get_overview, \
use khipu_list_endpoints or khipu_search_docs to find an operation, then khipu_get_endpoint and \
khipu_get_schema for fully resolved request/response definitions.";

const API_INSTRUCTIONS: &str = " Payment API tools (khipu_get_banks, khipu_create_payment, \
khipu_get_payment, khipu_delete_payment, khipu_confirm_payment, khipu_refund_payment, \
khipu_predict_payment, khipu_get_payment_methods) call the live API with the configured key.";

/// Cloned per MCP connection; all state behind it is shared and read-only.
#[derive(Clone)]
pub struct KhipuMcpService {
    pub(crate) navigator: Arc<SpecNavigator>,
    pub(crate) api: Option<ApiClient>,
    tool_router: ToolRouter<Self>,
}

impl KhipuMcpService {
    /// Documentation tools are always registered; payment API tools only with a client.
    #[must_use]
    pub fn new(navigator: Arc<SpecNavigator>, api: Option<ApiClient>) -> Self {
        let tool_router = if api.is_some() {
            Self::doc_tools() + Self::api_tools()
        } else {
            Self::doc_tools()
        };
        Self {
            navigator,
            api,
            tool_router,
        }
    }

    #[must_use]
    pub fn api_enabled(&self) -> bool {
        self.api.is_some()
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        names
    }

    #[cfg(test)]
    pub(crate) fn tools(&self) -> Vec<rmcp::model::Tool> {
        self.tool_router.list_all()
    }
}

#[tool_handler]
impl ServerHandler for KhipuMcpService {
    fn get_info(&self) -> ServerInfo {
        let mut instructions = DOC_INSTRUCTIONS.to_string();
        if self.api_enabled() {
            instructions.push_str(API_INSTRUCTIONS);
        }
        ServerInfo {
            instructions: Some(instructions),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
