use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Api,
    Ai,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Api => "api",
            Platform::Ai => "ai",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown platform {0:?}, expected \"api\" or \"ai\"")]
pub struct PlatformParsingError(pub String);

impl FromStr for Platform {
    type Err = PlatformParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Platform::Api),
            "ai" => Ok(Platform::Ai),
            other => Err(PlatformParsingError(other.to_owned())),
        }
    }
}

/// A resource policy to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPolicy {
    pub name: String,
    pub description: Option<String>,
    pub platform_type: Platform,
    /// Notification integration UUIDs the policy alerts through.
    pub notification_integrations: Vec<String>,
    pub saved_filter_uuids: Vec<String>,
    pub filters: Vec<Value>,
    pub premade_filter_uuids: Vec<String>,
}

/// Fields to change on an existing resource policy. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub alert_configs: Option<Vec<Value>>,
    pub saved_filter_uuids: Option<Vec<String>>,
    pub filters: Option<Vec<Value>>,
    pub premade_filter_uuids: Option<Vec<String>>,
}

/// The upstream operations exposed as tools. Results are upstream JSON, relayed
/// as-is.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn list_premade_filters(
        &self,
        org_uuid: &str,
        platform: Platform,
    ) -> Result<Value, anyhow::Error>;
    async fn list_resource_items(
        &self,
        org_uuid: &str,
        platform: Platform,
    ) -> Result<Value, anyhow::Error>;
    async fn list_resource_policies(
        &self,
        org_uuid: &str,
        platform: Platform,
        search_value: &str,
    ) -> Result<Value, anyhow::Error>;
    async fn list_notification_integrations(
        &self,
        org_uuid: &str,
        search_value: &str,
    ) -> Result<Value, anyhow::Error>;

    async fn create_resource_policy(
        &self,
        org_uuid: &str,
        policy: NewPolicy,
    ) -> Result<Value, anyhow::Error>;
    async fn get_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
        load_customizations: bool,
    ) -> Result<Value, anyhow::Error>;
    async fn update_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
        patch: PolicyPatch,
    ) -> Result<Value, anyhow::Error>;
    /// Returns the upstream confirmation message, if it sent one.
    async fn delete_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
    ) -> Result<Option<String>, anyhow::Error>;
}
