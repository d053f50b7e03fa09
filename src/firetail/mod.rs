//! Firetail resource-policy API provider.

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::debug;

use self::{
    auth::{AuthError, RenewableTokenProvider},
    http::{AuthenticatedClient, AuthenticatedRequest},
    utils::{check_status, ServerError},
};
use crate::core::{NewPolicy, Platform, PolicyPatch};

pub mod auth;
pub mod http;
pub mod utils;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("transport error")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("invalid JSON")]
    Json(#[from] serde_json::Error),
    #[error("form encoding failed")]
    FormEncoding(#[from] serde_urlencoded::ser::Error),
    #[error("invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
}

pub struct Provider<Tokens> {
    pub base_url: String,
    pub http: AuthenticatedClient<Tokens>,
}

impl<Tokens> Provider<Tokens>
where
    Tokens: RenewableTokenProvider<Error = Error>,
{
    /// `{base}/organisations/{org_uuid}/{segments..}`, each segment escaped.
    fn org_url(&self, org_uuid: &str, segments: &[&str]) -> Result<Url, Error> {
        let invalid = || Error::InvalidBaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push("organisations")
            .push(org_uuid)
            .extend(segments);
        Ok(url)
    }

    fn policy_url(&self, org_uuid: &str, policy_uuid: &str) -> Result<Url, Error> {
        self.org_url(org_uuid, &["resource-policies", policy_uuid])
    }

    async fn exec(&self, request: AuthenticatedRequest) -> Result<Value, Error> {
        let res = self.http.send(&request).await?;
        let res = check_status(res).await?;
        let body = res.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value = serde_json::from_str(&body)?;
        Ok(value)
    }

    async fn search(&self, org_uuid: &str, search: model::Search) -> Result<Value, Error> {
        debug!(message = "Searching", resource = %search.resource);
        let url = self.org_url(org_uuid, &["search"])?;
        let body = serde_json::to_value(&search)?;
        self.exec(AuthenticatedRequest::new(Method::POST, url).json(body))
            .await
    }

    pub async fn list_premade_filters(
        &self,
        org_uuid: &str,
        platform: Platform,
    ) -> Result<Value, Error> {
        let mut url = self.org_url(org_uuid, &["resource-policies", "filters"])?;
        url.query_pairs_mut().append_pair("platform", platform.as_str());
        self.exec(AuthenticatedRequest::new(Method::GET, url)).await
    }

    pub async fn list_resource_items(
        &self,
        org_uuid: &str,
        platform: Platform,
    ) -> Result<Value, Error> {
        let mut url = self.org_url(org_uuid, &["resource-policies", "resources"])?;
        url.query_pairs_mut().append_pair("platform", platform.as_str());
        self.exec(AuthenticatedRequest::new(Method::GET, url)).await
    }

    pub async fn list_resource_policies(
        &self,
        org_uuid: &str,
        platform: Platform,
        search_value: &str,
    ) -> Result<Value, Error> {
        let search = model::Search {
            search_value: search_value.to_owned(),
            filters: vec![model::SearchFilter {
                field: "platformType".into(),
                operator: Some(model::OPERATOR_IS_ONE_OF.into()),
                values: vec![platform.to_string()],
            }],
            sort: model::Sort::default(),
            resource: model::RESOURCE_POLICIES.into(),
        };
        self.search(org_uuid, search).await
    }

    pub async fn list_notification_integrations(
        &self,
        org_uuid: &str,
        search_value: &str,
    ) -> Result<Value, Error> {
        let search = model::Search {
            search_value: search_value.to_owned(),
            filters: Vec::new(),
            sort: model::Sort::default(),
            resource: model::RESOURCE_INTEGRATIONS.into(),
        };
        self.search(org_uuid, search).await
    }

    pub async fn create_resource_policy(
        &self,
        org_uuid: &str,
        policy: NewPolicy,
    ) -> Result<Value, Error> {
        let url = self.org_url(org_uuid, &["resource-policies"])?;
        let body = serde_json::to_value(model::CreatePolicy::from(policy))?;
        self.exec(AuthenticatedRequest::new(Method::POST, url).json(body))
            .await
    }

    pub async fn get_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
        load_customizations: bool,
    ) -> Result<Value, Error> {
        let mut url = self.policy_url(org_uuid, policy_uuid)?;
        url.query_pairs_mut()
            .append_pair("load_customizations", &load_customizations.to_string());
        self.exec(AuthenticatedRequest::new(Method::GET, url)).await
    }

    pub async fn update_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
        patch: PolicyPatch,
    ) -> Result<Value, Error> {
        let url = self.policy_url(org_uuid, policy_uuid)?;
        let body = serde_json::to_value(model::UpdatePolicy::from(patch))?;
        self.exec(AuthenticatedRequest::new(Method::PUT, url).json(body))
            .await
    }

    pub async fn delete_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
    ) -> Result<Option<String>, Error> {
        let url = self.policy_url(org_uuid, policy_uuid)?;
        let res = self.http.send(&AuthenticatedRequest::new(Method::DELETE, url)).await?;
        let res = check_status(res).await?;
        let body = res.text().await?;
        let message = serde_json::from_str::<model::DeleteResponse>(&body)
            .ok()
            .and_then(|response| response.message)
            .filter(|message| !message.is_empty());
        Ok(message)
    }
}

mod model {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    use crate::core::{NewPolicy, Platform, PolicyPatch};

    pub const RESOURCE_POLICIES: &str = "resource-policies";
    pub const RESOURCE_INTEGRATIONS: &str = "integrations";
    pub const OPERATOR_IS_ONE_OF: &str = "is-one-of";

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AlertConfig {
        #[serde(rename = "UUID")]
        pub uuid: String,
        pub notification_integrations: Vec<String>,
        pub minimum_resources: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreatePolicy {
        pub name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        pub platform_type: Platform,
        pub alert_configs: Vec<AlertConfig>,
        #[serde(rename = "savedFilterUUIDs")]
        pub saved_filter_uuids: Vec<String>,
        pub filters: Vec<Value>,
        #[serde(rename = "premadeFilterUUIDs")]
        pub premade_filter_uuids: Vec<String>,
    }

    impl From<NewPolicy> for CreatePolicy {
        fn from(policy: NewPolicy) -> Self {
            let NewPolicy {
                name,
                description,
                platform_type,
                notification_integrations,
                saved_filter_uuids,
                filters,
                premade_filter_uuids,
            } = policy;
            Self {
                name,
                description: description.filter(|description| !description.is_empty()),
                platform_type,
                alert_configs: vec![AlertConfig {
                    uuid: uuid::Uuid::new_v4().to_string(),
                    notification_integrations,
                    minimum_resources: 1,
                }],
                saved_filter_uuids,
                filters,
                premade_filter_uuids,
            }
        }
    }

    /// Partial update; absent fields are left out of the body entirely.
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdatePolicy {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub alert_configs: Option<Vec<Value>>,
        #[serde(
            rename = "savedFilterUUIDs",
            skip_serializing_if = "Option::is_none"
        )]
        pub saved_filter_uuids: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub filters: Option<Vec<Value>>,
        #[serde(
            rename = "premadeFilterUUIDs",
            skip_serializing_if = "Option::is_none"
        )]
        pub premade_filter_uuids: Option<Vec<String>>,
    }

    impl From<PolicyPatch> for UpdatePolicy {
        fn from(patch: PolicyPatch) -> Self {
            let PolicyPatch {
                name,
                description,
                alert_configs,
                saved_filter_uuids,
                filters,
                premade_filter_uuids,
            } = patch;
            Self {
                name,
                description,
                alert_configs,
                saved_filter_uuids,
                filters,
                premade_filter_uuids,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Search {
        pub search_value: String,
        pub filters: Vec<SearchFilter>,
        pub sort: Sort,
        pub resource: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct SearchFilter {
        pub field: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub operator: Option<String>,
        pub values: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Sort {
        pub order: String,
    }

    impl Default for Sort {
        fn default() -> Self {
            Self {
                order: "desc".into(),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct DeleteResponse {
        pub message: Option<String>,
    }
}

#[async_trait::async_trait]
impl<Tokens> crate::core::Backend for Provider<Tokens>
where
    Tokens: RenewableTokenProvider<Error = Error>,
{
    async fn list_premade_filters(
        &self,
        org_uuid: &str,
        platform: Platform,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.list_premade_filters(org_uuid, platform).await?)
    }

    async fn list_resource_items(
        &self,
        org_uuid: &str,
        platform: Platform,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.list_resource_items(org_uuid, platform).await?)
    }

    async fn list_resource_policies(
        &self,
        org_uuid: &str,
        platform: Platform,
        search_value: &str,
    ) -> Result<Value, anyhow::Error> {
        Ok(self
            .list_resource_policies(org_uuid, platform, search_value)
            .await?)
    }

    async fn list_notification_integrations(
        &self,
        org_uuid: &str,
        search_value: &str,
    ) -> Result<Value, anyhow::Error> {
        Ok(self
            .list_notification_integrations(org_uuid, search_value)
            .await?)
    }

    async fn create_resource_policy(
        &self,
        org_uuid: &str,
        policy: NewPolicy,
    ) -> Result<Value, anyhow::Error> {
        Ok(self.create_resource_policy(org_uuid, policy).await?)
    }

    async fn get_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
        load_customizations: bool,
    ) -> Result<Value, anyhow::Error> {
        Ok(self
            .get_resource_policy(org_uuid, policy_uuid, load_customizations)
            .await?)
    }

    async fn update_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
        patch: PolicyPatch,
    ) -> Result<Value, anyhow::Error> {
        Ok(self
            .update_resource_policy(org_uuid, policy_uuid, patch)
            .await?)
    }

    async fn delete_resource_policy(
        &self,
        org_uuid: &str,
        policy_uuid: &str,
    ) -> Result<Option<String>, anyhow::Error> {
        Ok(self.delete_resource_policy(org_uuid, policy_uuid).await?)
    }
}
