//! Authorize using the client credentials flow.

use std::{fmt, time::Duration};

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info};

use crate::firetail::Error;

/// Lifetime assumed when the token endpoint does not state one.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Longest lifetime taken at face value from the token endpoint.
pub const MAX_EXPIRES_IN_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to get access token: HTTP {status_code}: {body}")]
    Rejected { status_code: u16, body: String },
    #[error("Token endpoint did not return a JSON object")]
    MalformedResponse,
    #[error("No access token in response")]
    MissingAccessToken,
    #[error("Failed to obtain access token")]
    EmptyAccessToken,
    #[error("Access token is not a valid header value")]
    InvalidHeaderValue,
}

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_endpoint: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_endpoint", &self.token_endpoint)
            .finish()
    }
}

pub struct ClientCredentials {
    pub client: reqwest::Client,
    pub credentials: Credentials,
}

impl ClientCredentials {
    /// Perform the client credentials flow.
    pub async fn perform(&self) -> Result<AuthResponse, Error> {
        let params = &[
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let params = serde_urlencoded::to_string(params)?;

        debug!(
            message = "Requesting access token",
            token_endpoint = %self.credentials.token_endpoint,
        );

        let req = self
            .client
            .post(&self.credentials.token_endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(params)
            .build()?;

        let res = self.client.execute(req).await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(AuthError::Rejected {
                status_code: status.as_u16(),
                body,
            }
            .into());
        }

        let auth_response = AuthResponse::parse(&body)?;
        info!(
            message = "Access token obtained",
            expires_in_secs = auth_response.expires_in,
        );
        Ok(auth_response)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    /// The requested access token.
    pub access_token: String,
    /// The amount of time that an access token is valid (in seconds).
    pub expires_in: u64,
}

impl AuthResponse {
    /// Parse a token endpoint response body.
    ///
    /// `expires_in` falls back to [`DEFAULT_EXPIRES_IN_SECS`] when it is
    /// missing, zero or not an integer, and is capped at
    /// [`MAX_EXPIRES_IN_SECS`].
    pub fn parse(body: &str) -> Result<Self, AuthError> {
        let value: Value = serde_json::from_str(body).map_err(|_| AuthError::MalformedResponse)?;
        let object = value.as_object().ok_or(AuthError::MalformedResponse)?;

        let access_token = object
            .get("access_token")
            .ok_or(AuthError::MissingAccessToken)?;
        let access_token = match access_token.as_str() {
            Some(token) if !token.is_empty() => token.to_owned(),
            _ => return Err(AuthError::EmptyAccessToken),
        };

        let expires_in = object
            .get("expires_in")
            .and_then(Value::as_u64)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .min(MAX_EXPIRES_IN_SECS);

        Ok(Self {
            access_token,
            expires_in,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub expires_in: Duration,
}

impl From<AuthResponse> for Token {
    fn from(auth: AuthResponse) -> Self {
        let AuthResponse {
            access_token,
            expires_in,
        } = auth;
        Self {
            access_token,
            expires_in: Duration::from_secs(expires_in),
        }
    }
}

#[async_trait::async_trait]
impl super::TokenProvider for ClientCredentials {
    type Token = Token;
    type Error = Error;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error> {
        let auth_response = self.perform().await?;
        let token = auth_response.into();
        Ok(token)
    }
}

impl super::Token for Token {
    fn access_token(&self) -> &str {
        self.access_token.as_str()
    }
}

impl super::ExpiringToken for Token {
    fn expires_in(&self) -> Duration {
        self.expires_in
    }
}
