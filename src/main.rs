use std::sync::Arc;

use anyhow::Context;
use firetail_policy_mcp::{
    api::mcp::{McpServer, StdioTransport},
    config::Config,
    firetail::{
        self,
        auth::{ClientCredentials, TokenManager},
        http::AuthenticatedClient,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();

    let reqwest_client = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;

    let auth_provider = ClientCredentials {
        client: reqwest_client.clone(),
        credentials: config.credentials(),
    };
    let token_manager = TokenManager::new(auth_provider);

    let firetail_provider = firetail::Provider {
        base_url: config.api_base_url.clone(),
        http: AuthenticatedClient::new(reqwest_client, token_manager),
    };

    let server = McpServer::new(Arc::new(firetail_provider), config.defaults.clone());

    info!(
        message = "Firetail resource policy MCP server running on stdio",
        api_base_url = %config.api_base_url,
    );

    StdioTransport::new(server)
        .run()
        .await
        .context("serving stdio")?;
    Ok(())
}
