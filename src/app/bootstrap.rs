use crate::adapters::{OAuthClientCredentialsAdapter, RestAdapter};
use crate::config::gateway_config::{AdapterKind, GatewayConfig, ServiceConfig};
use crate::core::{CredentialStore, ServiceAdapter, ServiceGateway};
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::Validate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// 依設定檔建立 gateway，憑證由設定與環境變數載入
pub fn build_gateway(config: &GatewayConfig) -> Result<ServiceGateway> {
    build_gateway_with_credentials(config, CredentialStore::from_config(config))
}

pub fn build_gateway_with_credentials(
    config: &GatewayConfig,
    credentials: CredentialStore,
) -> Result<ServiceGateway> {
    config.validate()?;

    let mut builder = ServiceGateway::builder(credentials).default_timeout(config.default_timeout());

    for service in config.enabled_services() {
        let timeout = config.timeout_for(service);
        let adapter = build_adapter(service, timeout, config.user_agent())?;
        builder = builder.register_with_timeout(service.descriptor(), adapter, timeout)?;
    }

    let gateway = builder.build();
    tracing::info!(
        "🚀 Gateway ready with {} service(s)",
        gateway.services().len()
    );
    Ok(gateway)
}

fn http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?)
}

fn rest_adapter(service: &ServiceConfig, timeout: Duration, user_agent: &str) -> Result<RestAdapter> {
    let mut adapter = RestAdapter::new(http_client(timeout, user_agent)?)
        .with_auth(service.auth_placement()?)
        .with_body_encoding(service.body.unwrap_or_default());

    if let Some(headers) = &service.headers {
        adapter = adapter.with_headers(headers.clone());
    }
    Ok(adapter)
}

pub fn build_adapter(
    service: &ServiceConfig,
    timeout: Duration,
    user_agent: &str,
) -> Result<Arc<dyn ServiceAdapter>> {
    let adapter: Arc<dyn ServiceAdapter> = match service.adapter {
        AdapterKind::Rest => Arc::new(rest_adapter(service, timeout, user_agent)?),
        AdapterKind::OauthClientCredentials => {
            let token_path = service.token_path.clone().ok_or_else(|| {
                GatewayError::MissingConfigError {
                    field: format!("services.{}.token_path", service.name),
                }
            })?;

            let mut adapter =
                OAuthClientCredentialsAdapter::new(rest_adapter(service, timeout, user_agent)?, token_path);
            if let Some(audience) = &service.audience {
                adapter = adapter.with_audience(audience);
            }
            if let Some(scope) = &service.scope {
                adapter = adapter.with_scope(scope);
            }
            if let Some(encoding) = service.token_encoding {
                adapter = adapter.with_token_encoding(encoding);
            }
            Arc::new(adapter)
        }
        AdapterKind::S3 => s3_adapter(service)?,
    };

    Ok(adapter)
}

#[cfg(feature = "s3")]
fn s3_adapter(service: &ServiceConfig) -> Result<Arc<dyn ServiceAdapter>> {
    let mut adapter =
        crate::adapters::S3Adapter::new(service.region.clone().unwrap_or_else(|| "us-east-1".to_string()));
    if let Some(bucket) = &service.bucket {
        adapter = adapter.with_default_bucket(bucket);
    }
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "s3"))]
fn s3_adapter(service: &ServiceConfig) -> Result<Arc<dyn ServiceAdapter>> {
    Err(GatewayError::UnsupportedAdapterError {
        service: service.name.clone(),
        adapter: service.adapter.as_str().to_string(),
    })
}
