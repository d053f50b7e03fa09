use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    protocol::{
        CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
        DEFAULT_PROTOCOL_VERSION, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    },
    tools::{self, ToolCall},
};
use crate::{config::Defaults, core::Backend};

pub const SERVER_NAME: &str = "firetail-resource-policy-server";

const DELETED_FALLBACK_MESSAGE: &str = "Resource policy deleted successfully";

pub struct McpServer {
    backend: Arc<dyn Backend>,
    defaults: Defaults,
}

impl McpServer {
    pub fn new(backend: Arc<dyn Backend>, defaults: Defaults) -> Self {
        Self { backend, defaults }
    }

    /// Handle one raw line of input. `None` means no reply is due.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(message = "Unparseable message", error = %err);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {err}")),
            )),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let id = match id {
            Some(id) => id,
            None => {
                debug!(message = "Notification received", method = %method);
                return None;
            }
        };

        let response = match method.as_str() {
            "initialize" => JsonRpcResponse::result(id, Self::initialize(params.as_ref())),
            "ping" => JsonRpcResponse::result(id, json!({})),
            "tools/list" => JsonRpcResponse::result(id, json!({ "tools": tools::definitions() })),
            "tools/call" => match params.map(serde_json::from_value::<CallToolParams>) {
                Some(Ok(params)) => {
                    let result = self.call_tool(&params.name, params.arguments).await;
                    JsonRpcResponse::result(id, json!(result))
                }
                Some(Err(err)) => JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {err}")),
                ),
                None => JsonRpcResponse::error(
                    id,
                    JsonRpcError::new(INVALID_PARAMS, "Missing params"),
                ),
            },
            other => JsonRpcResponse::error(
                id,
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}")),
            ),
        };
        Some(response)
    }

    fn initialize(params: Option<&Value>) -> Value {
        let protocol_version = params
            .and_then(|params| params.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    /// Validate and run a tool. Failures of any kind come back as an error
    /// result rather than a protocol error.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> CallToolResult {
        let call = match ToolCall::parse(name, arguments, &self.defaults) {
            Ok(call) => call,
            Err(err) => {
                warn!(message = "Rejected tool call", tool = %name, error = %err);
                return CallToolResult::error(err);
            }
        };

        info!(message = "Calling tool", tool = call.name());
        match self.dispatch(call).await {
            Ok(text) => CallToolResult::text(text),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(message = "Tool call failed", tool = %name, error = %reason);
                CallToolResult::error(reason)
            }
        }
    }

    async fn dispatch(&self, call: ToolCall) -> Result<String, anyhow::Error> {
        let text = match call {
            ToolCall::ListPremadeFilters { org_uuid, platform } => {
                pretty(&self.backend.list_premade_filters(&org_uuid, platform).await?)?
            }
            ToolCall::ListResourceItems { org_uuid, platform } => {
                pretty(&self.backend.list_resource_items(&org_uuid, platform).await?)?
            }
            ToolCall::ListResourcePolicies {
                org_uuid,
                platform,
                search_value,
            } => pretty(
                &self
                    .backend
                    .list_resource_policies(&org_uuid, platform, &search_value)
                    .await?,
            )?,
            ToolCall::ListNotificationIntegrations {
                org_uuid,
                search_value,
            } => pretty(
                &self
                    .backend
                    .list_notification_integrations(&org_uuid, &search_value)
                    .await?,
            )?,
            ToolCall::CreateResourcePolicy { org_uuid, policy } => {
                let created = self.backend.create_resource_policy(&org_uuid, policy).await?;
                format!("Resource policy created successfully:\n{}", pretty(&created)?)
            }
            ToolCall::GetResourcePolicy {
                org_uuid,
                resource_policy_uuid,
                load_customizations,
            } => pretty(
                &self
                    .backend
                    .get_resource_policy(&org_uuid, &resource_policy_uuid, load_customizations)
                    .await?,
            )?,
            ToolCall::UpdateResourcePolicy {
                org_uuid,
                resource_policy_uuid,
                patch,
            } => {
                let updated = self
                    .backend
                    .update_resource_policy(&org_uuid, &resource_policy_uuid, patch)
                    .await?;
                format!("Resource policy updated successfully:\n{}", pretty(&updated)?)
            }
            ToolCall::DeleteResourcePolicy {
                org_uuid,
                resource_policy_uuid,
            } => self
                .backend
                .delete_resource_policy(&org_uuid, &resource_policy_uuid)
                .await?
                .unwrap_or_else(|| DELETED_FALLBACK_MESSAGE.to_owned()),
        };
        Ok(text)
    }
}

fn pretty(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
