use serde::{Deserialize, Serialize};
use std::fmt;

/// 呼叫參數：字串鍵對任意 JSON 值
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One external vendor integration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub base_url: String,
    pub credential_ref: String,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        credential_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            credential_ref: credential_ref.into(),
        }
    }
}

/// One outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub service: ServiceDescriptor,
    pub operation: String,
    #[serde(default)]
    pub payload: Payload,
}

impl CallRequest {
    pub fn new(service: ServiceDescriptor, operation: impl Into<String>) -> Self {
        Self {
            service,
            operation: operation.into(),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// 加入單一參數
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    AuthFailure,
    NetworkFailure,
    VendorRejected,
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::AuthFailure => "AuthFailure",
            ErrorKind::NetworkFailure => "NetworkFailure",
            ErrorKind::VendorRejected => "VendorRejected",
            ErrorKind::Timeout => "Timeout",
        };
        f.write_str(name)
    }
}

/// Outcome of exactly one `CallRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallResult {
    Success { data: serde_json::Value },
    Failure { kind: ErrorKind, message: String },
}

impl CallResult {
    pub fn success(data: serde_json::Value) -> Self {
        Self::Success { data }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_result_serialization_shape() {
        let ok = CallResult::success(json!({"ok": true}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"status": "success", "data": {"ok": true}})
        );

        let failed = CallResult::failure(ErrorKind::Timeout, "took too long");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"status": "failure", "kind": "Timeout", "message": "took too long"})
        );
    }

    #[test]
    fn test_call_result_accessors() {
        let ok = CallResult::success(json!([1, 2]));
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some(&json!([1, 2])));
        assert_eq!(ok.error_kind(), None);

        let failed = CallResult::failure(ErrorKind::AuthFailure, "no key");
        assert!(!failed.is_success());
        assert_eq!(failed.data(), None);
        assert_eq!(failed.error_kind(), Some(ErrorKind::AuthFailure));
    }

    #[test]
    fn test_call_request_builder() {
        let service = ServiceDescriptor::new("weather", "https://api.example.com", "WEATHER");
        let request = CallRequest::new(service.clone(), "GET /weather").with_param("q", "London");

        assert_eq!(request.service, service);
        assert_eq!(request.payload.get("q"), Some(&json!("London")));
    }
}
