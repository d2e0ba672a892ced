use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vendor_gateway::adapters::{BodyEncoding, OAuthClientCredentialsAdapter, RestAdapter};
use vendor_gateway::{
    CallRequest, Credential, CredentialStore, ErrorKind, ServiceDescriptor, ServiceGateway,
};

fn client_credentials() -> CredentialStore {
    CredentialStore::new().with_credential(
        "AUTH0",
        Credential::ClientCredentials {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
        },
    )
}

fn oauth_gateway(descriptor: &ServiceDescriptor, adapter: OAuthClientCredentialsAdapter) -> ServiceGateway {
    ServiceGateway::builder(client_credentials())
        .register_with_timeout(descriptor.clone(), Arc::new(adapter), Duration::from_secs(5))
        .expect("registration succeeds")
        .build()
}

/// 取得 token 後以 Bearer 呼叫 API
#[tokio::test]
async fn test_token_exchange_then_bearer_call() -> Result<()> {
    let server = MockServer::start_async().await;

    let token_mock = server.mock(|when, then| {
        when.method(POST).path("/oauth/token").json_body(json!({
            "grant_type": "client_credentials",
            "client_id": "client-id",
            "client_secret": "client-secret",
            "audience": "https://tenant.example.com/api/v2/"
        }));
        then.status(200).json_body(json!({
            "access_token": "mgmt_token_123",
            "token_type": "Bearer",
            "expires_in": 86400
        }));
    });

    let users_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v2/users")
            .query_param("q", "email:alice@example.com")
            .header("authorization", "Bearer mgmt_token_123");
        then.status(200)
            .json_body(json!([{"user_id": "auth0|1", "email": "alice@example.com"}]));
    });

    let descriptor = ServiceDescriptor::new("auth0", server.base_url(), "AUTH0");
    let adapter = OAuthClientCredentialsAdapter::new(RestAdapter::new(reqwest::Client::new()), "/oauth/token")
        .with_audience("https://tenant.example.com/api/v2/");
    let gateway = oauth_gateway(&descriptor, adapter);

    let request = CallRequest::new(descriptor, "GET /api/v2/users")
        .with_param("q", "email:alice@example.com");
    let result = gateway.invoke(request).await;

    assert_eq!(
        result.data(),
        Some(&json!([{"user_id": "auth0|1", "email": "alice@example.com"}]))
    );
    token_mock.assert();
    users_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_form_encoded_token_request() -> Result<()> {
    let server = MockServer::start_async().await;

    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/services/oauth2/token")
            .header("content-type", "application/x-www-form-urlencoded")
            .body_contains("grant_type=client_credentials")
            .body_contains("client_id=client-id");
        then.status(200).json_body(json!({"access_token": "sf_token"}));
    });

    let query_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/services/data/v59.0/sobjects/Account/001")
            .header("authorization", "Bearer sf_token");
        then.status(200).json_body(json!({"Id": "001", "Name": "Acme"}));
    });

    let descriptor = ServiceDescriptor::new("salesforce", server.base_url(), "AUTH0");
    let adapter = OAuthClientCredentialsAdapter::new(
        RestAdapter::new(reqwest::Client::new()),
        "/services/oauth2/token",
    )
    .with_token_encoding(BodyEncoding::Form);
    let gateway = oauth_gateway(&descriptor, adapter);

    let request = CallRequest::new(descriptor, "/services/data/v59.0/sobjects/Account/{id}")
        .with_param("id", "001");
    let result = gateway.invoke(request).await;

    assert_eq!(result.data(), Some(&json!({"Id": "001", "Name": "Acme"})));
    token_mock.assert();
    query_mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_rejected_token_request_is_auth_failure() -> Result<()> {
    let server = MockServer::start_async().await;

    server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(400).json_body(json!({"error": "invalid_client"}));
    });
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/api/v2/users");
        then.status(200).json_body(json!([]));
    });

    let descriptor = ServiceDescriptor::new("auth0", server.base_url(), "AUTH0");
    let adapter = OAuthClientCredentialsAdapter::new(RestAdapter::new(reqwest::Client::new()), "/oauth/token");
    let gateway = oauth_gateway(&descriptor, adapter);

    let result = gateway
        .invoke(CallRequest::new(descriptor, "GET /api/v2/users"))
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::AuthFailure));
    assert_eq!(api_mock.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_token_response_without_access_token() -> Result<()> {
    let server = MockServer::start_async().await;

    server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(200).json_body(json!({"token_type": "Bearer"}));
    });

    let descriptor = ServiceDescriptor::new("auth0", server.base_url(), "AUTH0");
    let adapter = OAuthClientCredentialsAdapter::new(RestAdapter::new(reqwest::Client::new()), "/oauth/token");
    let gateway = oauth_gateway(&descriptor, adapter);

    let result = gateway
        .invoke(CallRequest::new(descriptor, "GET /api/v2/users"))
        .await;

    assert_eq!(result.error_kind(), Some(ErrorKind::AuthFailure));
    Ok(())
}
