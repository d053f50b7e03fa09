//! Bearer-authenticated requests with a single retry on a stale token.

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method, StatusCode,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    auth::{AuthError, RenewableTokenProvider, Token},
    Error,
};

/// An outbound request, rebuilt for every attempt.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl AuthenticatedRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct AuthenticatedClient<Tokens> {
    client: reqwest::Client,
    tokens: Tokens,
}

impl<Tokens> AuthenticatedClient<Tokens>
where
    Tokens: RenewableTokenProvider<Error = Error>,
{
    pub fn new(client: reqwest::Client, tokens: Tokens) -> Self {
        Self { client, tokens }
    }

    pub fn token_provider(&self) -> &Tokens {
        &self.tokens
    }

    /// Send `request` with the current token.
    ///
    /// A 401 invalidates the token and the request is replayed exactly once
    /// with a freshly acquired one; whatever that attempt returns is final.
    /// Other statuses are returned untouched for the caller to interpret.
    pub async fn send(&self, request: &AuthenticatedRequest) -> Result<reqwest::Response, Error> {
        let token = self.tokens.get_auth_token().await?;
        let res = self.execute(request, token.access_token()).await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return Ok(res);
        }

        warn!(
            message = "Upstream rejected token, refreshing and retrying once",
            method = %request.method,
            url = %request.url,
        );
        self.tokens.invalidate().await;
        let token = self.tokens.get_auth_token().await?;
        self.execute(request, token.access_token()).await
    }

    async fn execute(
        &self,
        request: &AuthenticatedRequest,
        access_token: &str,
    ) -> Result<reqwest::Response, Error> {
        let req = self.build_request(request, access_token)?;
        debug!(message = "Sending request", method = %req.method(), url = %req.url());
        let res = self.client.execute(req).await?;
        debug!(message = "Got response", status = res.status().as_u16());
        Ok(res)
    }

    fn build_request(
        &self,
        request: &AuthenticatedRequest,
        access_token: &str,
    ) -> Result<reqwest::Request, Error> {
        let mut headers = request.headers.clone();
        let bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| AuthError::InvalidHeaderValue)?;
        headers.insert(AUTHORIZATION, bearer);

        let builder = self.client.request(request.method.clone(), &request.url);
        let builder = match &request.body {
            Some(body) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                builder.body(serde_json::to_vec(body)?)
            }
            None => builder,
        };

        builder.headers(headers).build().map_err(Error::Transport)
    }
}
