use crate::adapters::rest::{build_url, read_response, AuthPlacement, BodyEncoding, RestAdapter};
use crate::domain::credential::Credential;
use crate::domain::model::{Payload, ServiceDescriptor};
use crate::domain::ports::{AdapterError, ServiceAdapter};
use async_trait::async_trait;
use url::Url;

/// OAuth2 client-credentials flow (Auth0 management API, Salesforce connected apps).
///
/// Every call first exchanges the client id/secret for an access token, then
/// performs the REST call with `Authorization: Bearer <token>`. Tokens are not
/// cached between calls.
#[derive(Debug, Clone)]
pub struct OAuthClientCredentialsAdapter {
    inner: RestAdapter,
    token_path: String,
    audience: Option<String>,
    scope: Option<String>,
    token_encoding: BodyEncoding,
}

impl OAuthClientCredentialsAdapter {
    pub fn new(inner: RestAdapter, token_path: impl Into<String>) -> Self {
        Self {
            inner: inner.with_auth(AuthPlacement::Bearer),
            token_path: token_path.into(),
            audience: None,
            scope: None,
            token_encoding: BodyEncoding::Json,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Salesforce 的 token 端點只接受 form 編碼
    pub fn with_token_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.token_encoding = encoding;
        self
    }

    fn token_url(&self, service: &ServiceDescriptor) -> Result<Url, AdapterError> {
        if self.token_path.starts_with("http://") || self.token_path.starts_with("https://") {
            Url::parse(&self.token_path)
                .map_err(|e| AdapterError::InvalidRequest(format!("{}: {}", self.token_path, e)))
        } else {
            build_url(&service.base_url, &self.token_path)
        }
    }

    async fn fetch_token(
        &self,
        service: &ServiceDescriptor,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, AdapterError> {
        let url = self.token_url(service)?;

        let mut fields: Vec<(&str, &str)> = vec![
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(audience) = &self.audience {
            fields.push(("audience", audience.as_str()));
        }
        if let Some(scope) = &self.scope {
            fields.push(("scope", scope.as_str()));
        }

        tracing::debug!("🔑 {}: requesting access token from {}", service.name, url);

        let request = self.inner.client().post(url);
        let request = match self.token_encoding {
            BodyEncoding::Form => request.form(&fields),
            BodyEncoding::Json => {
                let body: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                    .collect();
                request.json(&body)
            }
        };

        let response = request.send().await?;
        let body = read_response(response).await.map_err(|err| match err {
            // 取 token 被拒一律視為授權失敗
            AdapterError::Rejected { status, message } => {
                AdapterError::Auth(format!("token endpoint returned {}: {}", status, message))
            }
            other => other,
        })?;

        body.get("access_token")
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Auth("token response has no access_token".to_string()))
    }
}

#[async_trait]
impl ServiceAdapter for OAuthClientCredentialsAdapter {
    fn vendor(&self) -> &str {
        "oauth_client_credentials"
    }

    async fn call(
        &self,
        service: &ServiceDescriptor,
        credential: &Credential,
        operation: &str,
        payload: &Payload,
    ) -> Result<serde_json::Value, AdapterError> {
        let Credential::ClientCredentials {
            client_id,
            client_secret,
        } = credential
        else {
            return Err(AdapterError::Auth(format!(
                "client credentials required, found '{}'",
                credential.kind_name()
            )));
        };

        let token = self.fetch_token(service, client_id, client_secret).await?;
        self.inner
            .call(service, &Credential::Bearer(token), operation, payload)
            .await
    }
}
