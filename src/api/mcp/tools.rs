//! Tool catalogue and argument validation.
//!
//! Every tool call is parsed into a [`ToolCall`] before anything touches the
//! network, so a missing or malformed argument never costs a token exchange.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    config::Defaults,
    core::{NewPolicy, Platform, PolicyPatch},
};

pub const LIST_PREMADE_FILTERS: &str = "list_premade_filters";
pub const LIST_RESOURCE_ITEMS: &str = "list_resource_items";
pub const LIST_RESOURCE_POLICIES: &str = "list_resource_policies";
pub const LIST_NOTIFICATION_INTEGRATIONS: &str = "list_notification_integrations";
pub const CREATE_RESOURCE_POLICY: &str = "create_resource_policy";
pub const GET_RESOURCE_POLICY: &str = "get_resource_policy";
pub const UPDATE_RESOURCE_POLICY: &str = "update_resource_policy";
pub const DELETE_RESOURCE_POLICY: &str = "delete_resource_policy";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Arguments must be a JSON object")]
    NotAnObject,
    #[error("Missing required argument: {0}")]
    Missing(&'static str),
    #[error("Invalid arguments: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListPremadeFilters {
        org_uuid: String,
        platform: Platform,
    },
    ListResourceItems {
        org_uuid: String,
        platform: Platform,
    },
    ListResourcePolicies {
        org_uuid: String,
        platform: Platform,
        search_value: String,
    },
    ListNotificationIntegrations {
        org_uuid: String,
        search_value: String,
    },
    CreateResourcePolicy {
        org_uuid: String,
        policy: NewPolicy,
    },
    GetResourcePolicy {
        org_uuid: String,
        resource_policy_uuid: String,
        load_customizations: bool,
    },
    UpdateResourcePolicy {
        org_uuid: String,
        resource_policy_uuid: String,
        patch: PolicyPatch,
    },
    DeleteResourcePolicy {
        org_uuid: String,
        resource_policy_uuid: String,
    },
}

#[derive(Deserialize)]
struct ScopeArgs {
    org_uuid: Option<String>,
    platform: Option<Platform>,
}

#[derive(Deserialize)]
struct SearchArgs {
    org_uuid: Option<String>,
    platform: Option<Platform>,
    search_value: Option<String>,
}

#[derive(Deserialize)]
struct PolicyArgs {
    org_uuid: Option<String>,
    resource_policy_uuid: Option<String>,
    load_customizations: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    #[serde(rename = "org_uuid")]
    org_uuid: Option<String>,
    name: Option<String>,
    description: Option<String>,
    platform_type: Option<Platform>,
    alert_configs: Option<Vec<String>>,
    #[serde(rename = "savedFilterUUIDs")]
    saved_filter_uuids: Option<Vec<String>>,
    filters: Option<Vec<Value>>,
    #[serde(rename = "premadeFilterUUIDs")]
    premade_filter_uuids: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateArgs {
    #[serde(rename = "org_uuid")]
    org_uuid: Option<String>,
    #[serde(rename = "resource_policy_uuid")]
    resource_policy_uuid: Option<String>,
    name: Option<String>,
    description: Option<String>,
    alert_configs: Option<Vec<Value>>,
    #[serde(rename = "savedFilterUUIDs")]
    saved_filter_uuids: Option<Vec<String>>,
    filters: Option<Vec<Value>>,
    #[serde(rename = "premadeFilterUUIDs")]
    premade_filter_uuids: Option<Vec<String>>,
}

impl ToolCall {
    /// Validate `arguments` for the tool called `name`, filling organisation
    /// and platform from `defaults` when the caller left them out.
    pub fn parse(
        name: &str,
        arguments: Option<Value>,
        defaults: &Defaults,
    ) -> Result<Self, ValidationError> {
        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(arguments @ Value::Object(_)) => arguments,
            Some(_) => return Err(ValidationError::NotAnObject),
        };

        let call = match name {
            LIST_PREMADE_FILTERS => {
                let args: ScopeArgs = from_arguments(arguments)?;
                ToolCall::ListPremadeFilters {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    platform: platform("platform", args.platform, defaults)?,
                }
            }
            LIST_RESOURCE_ITEMS => {
                let args: ScopeArgs = from_arguments(arguments)?;
                ToolCall::ListResourceItems {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    platform: platform("platform", args.platform, defaults)?,
                }
            }
            LIST_RESOURCE_POLICIES => {
                let args: SearchArgs = from_arguments(arguments)?;
                ToolCall::ListResourcePolicies {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    platform: platform("platform", args.platform, defaults)?,
                    search_value: args.search_value.unwrap_or_default(),
                }
            }
            LIST_NOTIFICATION_INTEGRATIONS => {
                let args: SearchArgs = from_arguments(arguments)?;
                ToolCall::ListNotificationIntegrations {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    search_value: args.search_value.unwrap_or_default(),
                }
            }
            CREATE_RESOURCE_POLICY => {
                let args: CreateArgs = from_arguments(arguments)?;
                ToolCall::CreateResourcePolicy {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    policy: NewPolicy {
                        name: required("name", args.name)?,
                        description: args.description,
                        platform_type: platform("platformType", args.platform_type, defaults)?,
                        notification_integrations: args
                            .alert_configs
                            .ok_or(ValidationError::Missing("alertConfigs"))?,
                        saved_filter_uuids: args
                            .saved_filter_uuids
                            .ok_or(ValidationError::Missing("savedFilterUUIDs"))?,
                        filters: args.filters.ok_or(ValidationError::Missing("filters"))?,
                        premade_filter_uuids: args
                            .premade_filter_uuids
                            .ok_or(ValidationError::Missing("premadeFilterUUIDs"))?,
                    },
                }
            }
            GET_RESOURCE_POLICY => {
                let args: PolicyArgs = from_arguments(arguments)?;
                ToolCall::GetResourcePolicy {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    resource_policy_uuid: required(
                        "resource_policy_uuid",
                        args.resource_policy_uuid,
                    )?,
                    load_customizations: args.load_customizations.unwrap_or(false),
                }
            }
            UPDATE_RESOURCE_POLICY => {
                let args: UpdateArgs = from_arguments(arguments)?;
                ToolCall::UpdateResourcePolicy {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    resource_policy_uuid: required(
                        "resource_policy_uuid",
                        args.resource_policy_uuid,
                    )?,
                    patch: PolicyPatch {
                        name: args.name,
                        description: args.description,
                        alert_configs: args.alert_configs,
                        saved_filter_uuids: args.saved_filter_uuids,
                        filters: args.filters,
                        premade_filter_uuids: args.premade_filter_uuids,
                    },
                }
            }
            DELETE_RESOURCE_POLICY => {
                let args: PolicyArgs = from_arguments(arguments)?;
                ToolCall::DeleteResourcePolicy {
                    org_uuid: org_uuid(args.org_uuid, defaults)?,
                    resource_policy_uuid: required(
                        "resource_policy_uuid",
                        args.resource_policy_uuid,
                    )?,
                }
            }
            other => return Err(ValidationError::UnknownTool(other.to_owned())),
        };
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::ListPremadeFilters { .. } => LIST_PREMADE_FILTERS,
            ToolCall::ListResourceItems { .. } => LIST_RESOURCE_ITEMS,
            ToolCall::ListResourcePolicies { .. } => LIST_RESOURCE_POLICIES,
            ToolCall::ListNotificationIntegrations { .. } => LIST_NOTIFICATION_INTEGRATIONS,
            ToolCall::CreateResourcePolicy { .. } => CREATE_RESOURCE_POLICY,
            ToolCall::GetResourcePolicy { .. } => GET_RESOURCE_POLICY,
            ToolCall::UpdateResourcePolicy { .. } => UPDATE_RESOURCE_POLICY,
            ToolCall::DeleteResourcePolicy { .. } => DELETE_RESOURCE_POLICY,
        }
    }
}

fn from_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, ValidationError> {
    serde_json::from_value(arguments).map_err(|err| ValidationError::Invalid(err.to_string()))
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::Missing(name))
}

fn org_uuid(value: Option<String>, defaults: &Defaults) -> Result<String, ValidationError> {
    let value = value
        .filter(|value| !value.is_empty())
        .or_else(|| defaults.org_uuid.clone());
    required("org_uuid", value)
}

fn platform(
    name: &'static str,
    value: Option<Platform>,
    defaults: &Defaults,
) -> Result<Platform, ValidationError> {
    value
        .or(defaults.platform)
        .ok_or(ValidationError::Missing(name))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn platform_property(description: &str) -> Value {
    json!({ "type": "string", "enum": ["api", "ai"], "description": description })
}

fn array(description: &str) -> Value {
    json!({ "type": "array", "description": description })
}

fn org_uuid_property() -> Value {
    string("Organisation UUID (defaults to FIRETAIL_ORG_UUID)")
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The `tools/list` catalogue.
pub fn definitions() -> Vec<ToolDefinition> {
    let platform = || platform_property("Platform type (defaults to FIRETAIL_PLATFORM)");
    vec![
        ToolDefinition {
            name: LIST_PREMADE_FILTERS,
            description: "List all premade filters for an organisation",
            input_schema: object_schema(
                json!({ "org_uuid": org_uuid_property(), "platform": platform() }),
                &[],
            ),
        },
        ToolDefinition {
            name: LIST_RESOURCE_ITEMS,
            description: "List all resource items for an organisation",
            input_schema: object_schema(
                json!({ "org_uuid": org_uuid_property(), "platform": platform() }),
                &[],
            ),
        },
        ToolDefinition {
            name: LIST_RESOURCE_POLICIES,
            description: "List the resource policies of an organisation",
            input_schema: object_schema(
                json!({
                    "org_uuid": org_uuid_property(),
                    "platform": platform(),
                    "search_value": string("Free-text search term"),
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: LIST_NOTIFICATION_INTEGRATIONS,
            description: "List the notification integrations of an organisation",
            input_schema: object_schema(
                json!({
                    "org_uuid": org_uuid_property(),
                    "search_value": string("Free-text search term"),
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: CREATE_RESOURCE_POLICY,
            description: "Create a new resource policy",
            input_schema: object_schema(
                json!({
                    "org_uuid": org_uuid_property(),
                    "name": string("Policy name (max 128 characters)"),
                    "description": string("Policy description (max 128 characters)"),
                    "platformType": platform(),
                    "alertConfigs": array("Notification integration UUIDs to alert through"),
                    "savedFilterUUIDs": array("Array of saved filter UUIDs"),
                    "filters": array("Array of resource filters"),
                    "premadeFilterUUIDs": array("Array of premade filter UUIDs"),
                }),
                &[
                    "name",
                    "alertConfigs",
                    "savedFilterUUIDs",
                    "filters",
                    "premadeFilterUUIDs",
                ],
            ),
        },
        ToolDefinition {
            name: GET_RESOURCE_POLICY,
            description: "Get a resource policy by UUID",
            input_schema: object_schema(
                json!({
                    "org_uuid": org_uuid_property(),
                    "resource_policy_uuid": string("Resource Policy UUID"),
                    "load_customizations": {
                        "type": "boolean",
                        "description": "Load customizations (default: false)",
                    },
                }),
                &["resource_policy_uuid"],
            ),
        },
        ToolDefinition {
            name: UPDATE_RESOURCE_POLICY,
            description: "Update an existing resource policy",
            input_schema: object_schema(
                json!({
                    "org_uuid": org_uuid_property(),
                    "resource_policy_uuid": string("Resource Policy UUID"),
                    "name": string("Policy name (max 128 characters)"),
                    "description": string("Policy description (max 128 characters)"),
                    "alertConfigs": array("Alert configurations"),
                    "savedFilterUUIDs": array("Array of saved filter UUIDs"),
                    "filters": array("Array of resource filters"),
                    "premadeFilterUUIDs": array("Array of premade filter UUIDs"),
                }),
                &["resource_policy_uuid"],
            ),
        },
        ToolDefinition {
            name: DELETE_RESOURCE_POLICY,
            description: "Delete a resource policy",
            input_schema: object_schema(
                json!({
                    "org_uuid": org_uuid_property(),
                    "resource_policy_uuid": string("Resource Policy UUID"),
                }),
                &["resource_policy_uuid"],
            ),
        },
    ]
}
