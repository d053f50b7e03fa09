// End-to-end tests of the upstream operations: real token exchange, token
// cache and authenticated client, against a mock Firetail API.

use std::sync::Arc;

use firetail_policy_mcp::{
    api::mcp::McpServer,
    config::Defaults,
    core::{NewPolicy, Platform, PolicyPatch},
    firetail::{
        auth::{AuthError, ClientCredentials, Credentials, TokenManager},
        http::AuthenticatedClient,
        utils::ServerError,
        Error, Provider,
    },
};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;

type FiretailProvider = Provider<TokenManager<ClientCredentials>>;

fn provider(server: &ServerGuard) -> FiretailProvider {
    let client = reqwest::Client::new();
    let credentials = Credentials {
        client_id: "client-id".into(),
        client_secret: "client-secret".into(),
        token_endpoint: format!("{}/oauth/token", server.url()),
    };
    Provider {
        base_url: server.url(),
        http: AuthenticatedClient::new(
            client.clone(),
            TokenManager::new(ClientCredentials {
                client,
                credentials,
            }),
        ),
    }
}

async fn token_endpoint(server: &mut ServerGuard, hits: usize) -> Mock {
    server
        .mock("POST", "/oauth/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "client_credentials".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok-1","expires_in":3600}"#)
        .expect(hits)
        .create_async()
        .await
}

/// Matches `path` with or without a query string.
fn path(path: &str) -> Matcher {
    Matcher::Regex(format!(r"^{path}(\?.*)?$"))
}

#[tokio::test]
async fn list_premade_filters_relays_json_and_caches_token() {
    let mut server = mockito::Server::new_async().await;
    let token = token_endpoint(&mut server, 1).await;
    let filters = server
        .mock("GET", path("/organisations/org-1/resource-policies/filters"))
        .match_query(Matcher::UrlEncoded("platform".into(), "ai".into()))
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_body(r#"[{"UUID":"f-1","name":"PII"}]"#)
        .expect(2)
        .create_async()
        .await;

    let provider = provider(&server);
    for _ in 0..2 {
        let value = provider
            .list_premade_filters("org-1", Platform::Ai)
            .await
            .unwrap();
        assert_eq!(value, json!([{"UUID": "f-1", "name": "PII"}]));
    }

    token.assert_async().await;
    filters.assert_async().await;
}

#[tokio::test]
async fn list_resource_items_uses_platform_query() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let items = server
        .mock("GET", path("/organisations/org-1/resource-policies/resources"))
        .match_query(Matcher::UrlEncoded("platform".into(), "api".into()))
        .with_status(200)
        .with_body(r#"{"items":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let value = provider(&server)
        .list_resource_items("org-1", Platform::Api)
        .await
        .unwrap();
    assert_eq!(value, json!({"items": []}));
    items.assert_async().await;
}

#[tokio::test]
async fn get_policy_404_surfaces_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let _policy = server
        .mock("GET", path("/organisations/org-1/resource-policies/pol-1"))
        .match_query(Matcher::UrlEncoded(
            "load_customizations".into(),
            "true".into(),
        ))
        .with_status(404)
        .with_body(r#"{"error":"not found"}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .get_resource_policy("org-1", "pol-1", true)
        .await
        .unwrap_err();
    match &err {
        Error::Server(ServerError { status_code, body }) => {
            assert_eq!(*status_code, 404);
            assert_eq!(body, r#"{"error":"not found"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("404"));
    assert!(message.contains(r#"{"error":"not found"}"#));
}

#[tokio::test]
async fn policy_uuid_cannot_inject_query_parameters() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let policy = server
        .mock(
            "GET",
            path("/organisations/org-1/resource-policies/pol-1%3Fload_customizations=true%23"),
        )
        .match_query(Matcher::UrlEncoded(
            "load_customizations".into(),
            "false".into(),
        ))
        .with_status(200)
        .with_body(r#"{"UUID":"pol-1"}"#)
        .expect(1)
        .create_async()
        .await;

    provider(&server)
        .get_resource_policy("org-1", "pol-1?load_customizations=true#", false)
        .await
        .unwrap();
    policy.assert_async().await;
}

#[tokio::test]
async fn tool_error_result_carries_upstream_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let _policy = server
        .mock("GET", path("/organisations/org-1/resource-policies/pol-1"))
        .with_status(404)
        .with_body(r#"{"error":"not found"}"#)
        .create_async()
        .await;

    let mcp = McpServer::new(Arc::new(provider(&server)), Defaults::default());
    let result = mcp
        .call_tool(
            "get_resource_policy",
            Some(json!({"org_uuid": "org-1", "resource_policy_uuid": "pol-1"})),
        )
        .await;

    assert!(result.is_error);
    assert_eq!(
        result.first_text(),
        Some(r#"Error: HTTP 404: {"error":"not found"}"#)
    );
}

#[tokio::test]
async fn token_without_access_token_fails_and_stays_unset() {
    let mut server = mockito::Server::new_async().await;
    let token = server
        .mock("POST", "/oauth/token")
        .with_status(200)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;
    let api = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let provider = provider(&server);
    for _ in 0..2 {
        let err = provider
            .list_premade_filters("org-1", Platform::Api)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::MissingAccessToken)));
    }

    token.assert_async().await;
    api.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_error_message() {
    let mut server = mockito::Server::new_async().await;
    let _token = server
        .mock("POST", "/oauth/token")
        .with_status(401)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;

    let mcp = McpServer::new(Arc::new(provider(&server)), Defaults::default());
    let result = mcp
        .call_tool(
            "list_premade_filters",
            Some(json!({"org_uuid": "org-1", "platform": "api"})),
        )
        .await;

    assert!(result.is_error);
    assert_eq!(
        result.first_text(),
        Some(r#"Error: Failed to get access token: HTTP 401: {"error":"invalid_client"}"#)
    );
}

#[tokio::test]
async fn repeated_401_refreshes_once_then_fails() {
    let mut server = mockito::Server::new_async().await;
    let token = token_endpoint(&mut server, 2).await;
    let policy = server
        .mock("DELETE", "/organisations/org-1/resource-policies/pol-1")
        .with_status(401)
        .with_body("token revoked")
        .expect(2)
        .create_async()
        .await;

    let err = provider(&server)
        .delete_resource_policy("org-1", "pol-1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Server(ServerError {
            status_code: 401,
            ..
        })
    ));

    token.assert_async().await;
    policy.assert_async().await;
}

#[tokio::test]
async fn update_sends_only_supplied_fields() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let update = server
        .mock("PUT", "/organisations/org-1/resource-policies/pol-1")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"name": "x"})))
        .with_status(200)
        .with_body(r#"{"UUID":"pol-1","name":"x"}"#)
        .expect(1)
        .create_async()
        .await;

    let patch = PolicyPatch {
        name: Some("x".into()),
        ..PolicyPatch::default()
    };
    let value = provider(&server)
        .update_resource_policy("org-1", "pol-1", patch)
        .await
        .unwrap();
    assert_eq!(value["name"], "x");
    update.assert_async().await;
}

#[tokio::test]
async fn create_posts_policy_payload() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let create = server
        .mock("POST", "/organisations/org-1/resource-policies")
        .match_body(Matcher::PartialJson(json!({
            "name": "block-pii",
            "description": "no secrets",
            "platformType": "ai",
            "savedFilterUUIDs": [],
            "filters": [],
            "premadeFilterUUIDs": ["pre-1"],
        })))
        .with_status(201)
        .with_body(r#"{"UUID":"pol-9","name":"block-pii"}"#)
        .expect(1)
        .create_async()
        .await;

    let policy = NewPolicy {
        name: "block-pii".into(),
        description: Some("no secrets".into()),
        platform_type: Platform::Ai,
        notification_integrations: vec!["int-1".into()],
        saved_filter_uuids: vec![],
        filters: vec![],
        premade_filter_uuids: vec!["pre-1".into()],
    };
    let value = provider(&server)
        .create_resource_policy("org-1", policy)
        .await
        .unwrap();
    assert_eq!(value["UUID"], "pol-9");
    create.assert_async().await;
}

#[tokio::test]
async fn list_policies_searches_by_platform() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let search = server
        .mock("POST", "/organisations/org-1/search")
        .match_body(Matcher::Json(json!({
            "search_value": "pii",
            "filters": [{"field": "platformType", "operator": "is-one-of", "values": ["api"]}],
            "sort": {"order": "desc"},
            "resource": "resource-policies",
        })))
        .with_status(200)
        .with_body(r#"{"items":[{"UUID":"pol-1"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let value = provider(&server)
        .list_resource_policies("org-1", Platform::Api, "pii")
        .await
        .unwrap();
    assert_eq!(value["items"][0]["UUID"], "pol-1");
    search.assert_async().await;
}

#[tokio::test]
async fn list_integrations_searches_integrations() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let search = server
        .mock("POST", "/organisations/org-1/search")
        .match_body(Matcher::PartialJson(json!({
            "resource": "integrations",
            "filters": [],
        })))
        .with_status(200)
        .with_body(r#"{"items":[]}"#)
        .expect(1)
        .create_async()
        .await;

    provider(&server)
        .list_notification_integrations("org-1", "")
        .await
        .unwrap();
    search.assert_async().await;
}

#[tokio::test]
async fn delete_returns_upstream_message_when_present() {
    let mut server = mockito::Server::new_async().await;
    let _token = token_endpoint(&mut server, 1).await;
    let _with_message = server
        .mock("DELETE", "/organisations/org-1/resource-policies/pol-1")
        .with_status(200)
        .with_body(r#"{"message":"Policy pol-1 removed"}"#)
        .create_async()
        .await;
    let _without_message = server
        .mock("DELETE", "/organisations/org-1/resource-policies/pol-2")
        .with_status(204)
        .create_async()
        .await;

    let provider = provider(&server);
    assert_eq!(
        provider
            .delete_resource_policy("org-1", "pol-1")
            .await
            .unwrap()
            .as_deref(),
        Some("Policy pol-1 removed")
    );
    assert_eq!(
        provider
            .delete_resource_policy("org-1", "pol-2")
            .await
            .unwrap(),
        None
    );
}
