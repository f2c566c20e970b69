//! MCP server exposing the operation catalogue over stdio.
//!
//! `tools/list` renders every catalogue descriptor; `tools/call` goes through
//! the shared catalogue dispatcher. Only an unknown tool name is a protocol
//! error, every other failure comes back as an `isError` result.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool, ToolAnnotations,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use tracing::info;

use crate::bridge::{Executor, Runner};
use crate::catalogue::{self, OperationDescriptor, ToolResponse};

pub const SERVER_NAME: &str = "s9s-mcp";

#[derive(Debug, Clone)]
pub struct BridgeServer<E = Runner> {
    executor: Arc<E>,
}

impl<E: Executor> BridgeServer<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }
}

/// MCP tool definition for one descriptor.
pub fn tool_for(descriptor: &OperationDescriptor) -> Tool {
    Tool::new(
        descriptor.name,
        descriptor.description,
        Arc::new(descriptor.input_schema()),
    )
    .annotate(
        ToolAnnotations::with_title(descriptor.title)
            .read_only(descriptor.read_only)
            .destructive(!descriptor.read_only),
    )
}

fn into_call_result(response: ToolResponse) -> CallToolResult {
    let content = response
        .content
        .into_iter()
        .map(|c| Content::text(c.text))
        .collect();
    if response.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

fn instructions() -> String {
    let tools = catalogue::catalogue()
        .iter()
        .map(|d| format!("- {} ({})", d.name, d.title))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Runs the s9s ClusterControl CLI. Connection settings come from the server's \
         CC_HOST, CC_PORT, CC_USER, CC_PASS, CC_KEYFILE and S9S_HOME environment.\nTools:\n{tools}"
    )
}

impl<E: Executor + 'static> ServerHandler for BridgeServer<E> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(instructions()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(
            catalogue::catalogue().iter().map(tool_for).collect(),
        ))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let Some(descriptor) = catalogue::find(&request.name) else {
            return Err(McpError::invalid_params(
                format!("tool '{}' not found", request.name),
                None,
            ));
        };
        info!(tool = descriptor.name, "tool call");
        let response =
            catalogue::dispatch(descriptor, request.arguments.as_ref(), self.executor.as_ref())
                .await;
        Ok(into_call_result(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::client::result_text;

    #[test]
    fn every_descriptor_becomes_a_tool() {
        let tools: Vec<Tool> = catalogue::catalogue().iter().map(tool_for).collect();
        assert_eq!(tools.len(), catalogue::catalogue().len());
        let exec = serde_json::to_value(tools.iter().find(|t| t.name == "s9s_exec").unwrap())
            .unwrap();
        assert_eq!(exec["inputSchema"]["required"], serde_json::json!(["subcommand"]));
        assert_eq!(exec["annotations"]["readOnlyHint"], false);
        let version = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(version["name"], "s9s_version");
        assert_eq!(version["annotations"]["readOnlyHint"], true);
        assert!(version["annotations"]["title"].is_string());
    }

    #[test]
    fn response_maps_error_flag() {
        let (text, is_error) = result_text(&into_call_result(ToolResponse::new("boom", true)));
        assert_eq!(text, "boom");
        assert!(is_error);
        let (text, is_error) = result_text(&into_call_result(ToolResponse::new("ok", false)));
        assert_eq!(text, "ok");
        assert!(!is_error);
    }

    #[test]
    fn info_advertises_tools() {
        let info = BridgeServer::new(Runner::from_process_env()).get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.instructions.unwrap_or_default().contains("s9s_exec"));
    }
}
