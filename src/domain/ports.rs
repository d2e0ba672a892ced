use crate::domain::credential::Credential;
use crate::domain::model::{ErrorKind, Payload, ServiceDescriptor};
use async_trait::async_trait;
use thiserror::Error;

/// 廠商呼叫失敗，由各 adapter 產生，再由 gateway 轉為 `CallResult::Failure`
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("vendor rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

impl AdapterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Auth(_) => ErrorKind::AuthFailure,
            AdapterError::Network(_) => ErrorKind::NetworkFailure,
            AdapterError::Rejected { .. } | AdapterError::InvalidRequest(_) => {
                ErrorKind::VendorRejected
            }
            AdapterError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// 依 HTTP 狀態碼分類
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            401 | 403 => AdapterError::Auth(format!("status {}: {}", status, message)),
            408 | 504 => AdapterError::Timeout(format!("status {}: {}", status, message)),
            _ => AdapterError::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            AdapterError::from_status(status.as_u16(), err.to_string())
        } else if err.is_builder() {
            AdapterError::InvalidRequest(err.to_string())
        } else {
            AdapterError::Network(err.to_string())
        }
    }
}

/// Capability interface implemented once per vendor kind.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Short adapter name used in logs.
    fn vendor(&self) -> &str;

    async fn call(
        &self,
        service: &ServiceDescriptor,
        credential: &Credential,
        operation: &str,
        payload: &Payload,
    ) -> Result<serde_json::Value, AdapterError>;
}
