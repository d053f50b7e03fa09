//! Process configuration, read from the environment once at startup.
//!
//! Missing values become empty strings instead of aborting: absent credentials
//! show up as an authentication failure on the first tool call.

use std::fmt;

use tracing::warn;

use crate::{core::Platform, firetail::auth::Credentials};

pub const ENV_API_URL: &str = "FIRETAIL_API_URL";
pub const ENV_CLIENT_ID: &str = "FIRETAIL_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "FIRETAIL_CLIENT_SECRET";
pub const ENV_ORG_UUID: &str = "FIRETAIL_ORG_UUID";
pub const ENV_PLATFORM: &str = "FIRETAIL_PLATFORM";

#[derive(Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub defaults: Defaults,
}

/// Fallbacks for tool arguments the caller leaves out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    pub org_uuid: Option<String>,
    pub platform: Option<Platform>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let platform = non_empty(ENV_PLATFORM).and_then(|value| match value.trim().parse() {
            Ok(platform) => Some(platform),
            Err(err) => {
                warn!(message = "Ignoring default platform", error = %err);
                None
            }
        });

        Self {
            api_base_url: get(ENV_API_URL).trim_end_matches('/').to_owned(),
            client_id: get(ENV_CLIENT_ID),
            client_secret: get(ENV_CLIENT_SECRET),
            defaults: Defaults {
                org_uuid: non_empty(ENV_ORG_UUID),
                platform,
            },
        }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.api_base_url)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            token_endpoint: self.token_endpoint(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("defaults", &self.defaults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_values_default_to_empty() {
        let config = config_from(&[]);
        assert_eq!(config.api_base_url, "");
        assert_eq!(config.client_id, "");
        assert_eq!(config.client_secret, "");
        assert_eq!(config.defaults, Defaults::default());
        assert_eq!(config.token_endpoint(), "/oauth/token");
    }

    #[test]
    fn reads_all_values() {
        let config = config_from(&[
            (ENV_API_URL, "https://api.example.com/"),
            (ENV_CLIENT_ID, "id"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_ORG_UUID, "org-1"),
            (ENV_PLATFORM, "ai"),
        ]);
        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(
            config.credentials().token_endpoint,
            "https://api.example.com/oauth/token"
        );
        assert_eq!(config.defaults.org_uuid.as_deref(), Some("org-1"));
        assert_eq!(config.defaults.platform, Some(Platform::Ai));
    }

    #[test]
    fn unknown_platform_is_ignored() {
        let config = config_from(&[(ENV_PLATFORM, "mainframe"), (ENV_ORG_UUID, " ")]);
        assert_eq!(config.defaults, Defaults::default());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = config_from(&[(ENV_CLIENT_SECRET, "hunter2")]);
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
