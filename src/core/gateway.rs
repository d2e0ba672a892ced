use crate::core::credentials::CredentialStore;
use crate::domain::model::{CallRequest, CallResult, ErrorKind, Payload, ServiceDescriptor};
use crate::domain::ports::ServiceAdapter;
use crate::utils::error::{GatewayError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

fn panic_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

struct Registration {
    descriptor: ServiceDescriptor,
    adapter: Arc<dyn ServiceAdapter>,
    timeout: Duration,
}

pub struct GatewayBuilder {
    credentials: CredentialStore,
    default_timeout: Duration,
    services: HashMap<String, Registration>,
}

impl GatewayBuilder {
    pub fn new(credentials: CredentialStore) -> Self {
        Self {
            credentials,
            default_timeout: DEFAULT_CALL_TIMEOUT,
            services: HashMap::new(),
        }
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn register(
        self,
        descriptor: ServiceDescriptor,
        adapter: Arc<dyn ServiceAdapter>,
    ) -> Result<Self> {
        let timeout = self.default_timeout;
        self.register_with_timeout(descriptor, adapter, timeout)
    }

    pub fn register_with_timeout(
        mut self,
        descriptor: ServiceDescriptor,
        adapter: Arc<dyn ServiceAdapter>,
        timeout: Duration,
    ) -> Result<Self> {
        if self.services.contains_key(&descriptor.name) {
            return Err(GatewayError::DuplicateServiceError {
                name: descriptor.name,
            });
        }

        tracing::debug!(
            "🔌 Registered service '{}' ({} adapter, timeout {:?})",
            descriptor.name,
            adapter.vendor(),
            timeout
        );

        self.services.insert(
            descriptor.name.clone(),
            Registration {
                descriptor,
                adapter,
                timeout,
            },
        );
        Ok(self)
    }

    pub fn build(self) -> ServiceGateway {
        ServiceGateway {
            credentials: self.credentials,
            services: self.services,
        }
    }
}

/// Uniform entry point for every vendor call.
///
/// Registrations and credentials are fixed once built, so a gateway can be
/// shared across tasks behind an `Arc` without locking.
pub struct ServiceGateway {
    credentials: CredentialStore,
    services: HashMap<String, Registration>,
}

impl ServiceGateway {
    pub fn builder(credentials: CredentialStore) -> GatewayBuilder {
        GatewayBuilder::new(credentials)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.get(name).map(|r| &r.descriptor)
    }

    /// 依名稱排序的已註冊服務
    pub fn services(&self) -> Vec<&ServiceDescriptor> {
        let mut descriptors: Vec<&ServiceDescriptor> =
            self.services.values().map(|r| &r.descriptor).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn timeout_for(&self, name: &str) -> Option<Duration> {
        self.services.get(name).map(|r| r.timeout)
    }

    pub fn has_credentials(&self, descriptor: &ServiceDescriptor) -> bool {
        self.credentials.contains(&descriptor.credential_ref)
    }

    pub fn request(
        &self,
        name: &str,
        operation: impl Into<String>,
        payload: Payload,
    ) -> Option<CallRequest> {
        self.descriptor(name)
            .map(|descriptor| CallRequest::new(descriptor.clone(), operation).with_payload(payload))
    }

    /// Perform one vendor call. Never fails: every outcome is a `CallResult`.
    pub async fn invoke(&self, request: CallRequest) -> CallResult {
        let service = &request.service;

        let Some(registration) = self.services.get(&service.name) else {
            tracing::warn!("⚠️ No adapter registered for service '{}'", service.name);
            return CallResult::failure(
                ErrorKind::VendorRejected,
                format!("service '{}' is not registered", service.name),
            );
        };

        if registration.descriptor != *service {
            tracing::warn!(
                "⚠️ Descriptor for '{}' does not match the registered one",
                service.name
            );
            return CallResult::failure(
                ErrorKind::VendorRejected,
                format!(
                    "descriptor for service '{}' does not match its registration",
                    service.name
                ),
            );
        }

        // 沒有憑證就不發出任何網路請求
        let Some(credential) = self.credentials.get(&service.credential_ref) else {
            tracing::warn!(
                "🔐 {}: no credentials found for '{}'",
                service.name,
                service.credential_ref
            );
            return CallResult::failure(
                ErrorKind::AuthFailure,
                format!(
                    "no credentials configured for '{}' (service '{}')",
                    service.credential_ref, service.name
                ),
            );
        };

        let started = Instant::now();
        tracing::debug!(
            "📡 {}: invoking '{}' via {} adapter",
            service.name,
            request.operation,
            registration.adapter.vendor()
        );

        // 在獨立 task 中執行，adapter panic 時仍能回傳結果
        let adapter = Arc::clone(&registration.adapter);
        let call_service = service.clone();
        let call_credential = credential.clone();
        let operation = request.operation.clone();
        let payload = request.payload.clone();
        let mut handle = tokio::spawn(async move {
            adapter
                .call(&call_service, &call_credential, &operation, &payload)
                .await
        });

        let outcome = tokio::time::timeout(registration.timeout, &mut handle).await;

        let elapsed = started.elapsed();
        let result = match outcome {
            Ok(Ok(Ok(data))) => CallResult::success(data),
            Ok(Ok(Err(err))) => CallResult::failure(err.kind(), err.to_string()),
            Ok(Err(join_error)) => CallResult::failure(
                ErrorKind::VendorRejected,
                format!(
                    "adapter for service '{}' failed: {}",
                    service.name,
                    panic_message(join_error)
                ),
            ),
            Err(_) => {
                handle.abort();
                CallResult::failure(
                    ErrorKind::Timeout,
                    format!(
                        "'{}' on service '{}' did not complete within {:?}",
                        request.operation, service.name, registration.timeout
                    ),
                )
            }
        };

        match &result {
            CallResult::Success { .. } => tracing::info!(
                "✅ {}: '{}' succeeded in {:?}",
                service.name,
                request.operation,
                elapsed
            ),
            CallResult::Failure { kind, message } => tracing::warn!(
                "❌ {}: '{}' failed after {:?} ({}): {}",
                service.name,
                request.operation,
                elapsed,
                kind,
                message
            ),
        }

        result
    }

    /// Run independent calls concurrently. Results come back in request order.
    pub async fn invoke_all(self: &Arc<Self>, requests: Vec<CallRequest>) -> Vec<CallResult> {
        let total = requests.len();
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let gateway = Arc::clone(self);
            tasks.spawn(async move { (index, gateway.invoke(request).await) });
        }

        let mut slots: Vec<Option<CallResult>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!("❌ Gateway task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    CallResult::failure(ErrorKind::VendorRejected, "call was aborted before completing")
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::Credential;
    use crate::domain::ports::AdapterError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 模擬廠商：依 operation 決定回應
    struct ScriptedAdapter {
        calls: AtomicUsize,
    }

    impl ScriptedAdapter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ServiceAdapter for ScriptedAdapter {
        fn vendor(&self) -> &str {
            "scripted"
        }

        async fn call(
            &self,
            _service: &ServiceDescriptor,
            _credential: &Credential,
            operation: &str,
            payload: &Payload,
        ) -> std::result::Result<serde_json::Value, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match operation {
                "echo" => Ok(serde_json::Value::Object(payload.clone())),
                "hang" => std::future::pending().await,
                "sleep" => {
                    let ms = payload.get("ms").and_then(|v| v.as_u64()).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(json!({ "slept": ms }))
                }
                "unauthorized" => Err(AdapterError::from_status(401, "bad key")),
                "offline" => Err(AdapterError::Network("connection refused".to_string())),
                "explode" => panic!("adapter exploded"),
                _ => Err(AdapterError::from_status(404, "no such operation")),
            }
        }
    }

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::new("crm", "https://crm.example.com", "CRM")
    }

    fn gateway_with(adapter: Arc<ScriptedAdapter>, timeout: Duration) -> ServiceGateway {
        let credentials =
            CredentialStore::new().with_credential("CRM", Credential::Bearer("token".into()));
        ServiceGateway::builder(credentials)
            .default_timeout(timeout)
            .register(descriptor(), adapter)
            .unwrap()
            .build()
    }

    #[tokio::test]
    async fn test_success_passes_payload_through_unchanged() {
        let adapter = ScriptedAdapter::new();
        let gateway = gateway_with(adapter.clone(), Duration::from_secs(1));

        let request = CallRequest::new(descriptor(), "echo").with_param("ok", true);
        let result = gateway.invoke(request).await;

        assert_eq!(result, CallResult::success(json!({"ok": true})));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_hanging_vendor_times_out_within_bound() {
        let adapter = ScriptedAdapter::new();
        let timeout = Duration::from_millis(50);
        let gateway = gateway_with(adapter, timeout);

        let started = Instant::now();
        let result = gateway.invoke(CallRequest::new(descriptor(), "hang")).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
        assert!(started.elapsed() < timeout + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_the_adapter() {
        let adapter = ScriptedAdapter::new();
        let gateway = ServiceGateway::builder(CredentialStore::new())
            .register(descriptor(), adapter.clone())
            .unwrap()
            .build();

        let result = gateway.invoke(CallRequest::new(descriptor(), "echo")).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::AuthFailure));
        assert_eq!(adapter.calls(), 0);
        assert!(!gateway.has_credentials(&descriptor()));
    }

    #[tokio::test]
    async fn test_adapter_errors_are_mapped() {
        let adapter = ScriptedAdapter::new();
        let gateway = gateway_with(adapter, Duration::from_secs(1));

        let unauthorized = gateway
            .invoke(CallRequest::new(descriptor(), "unauthorized"))
            .await;
        assert_eq!(unauthorized.error_kind(), Some(ErrorKind::AuthFailure));

        let offline = gateway.invoke(CallRequest::new(descriptor(), "offline")).await;
        assert_eq!(offline.error_kind(), Some(ErrorKind::NetworkFailure));

        let unknown = gateway.invoke(CallRequest::new(descriptor(), "refund")).await;
        assert_eq!(unknown.error_kind(), Some(ErrorKind::VendorRejected));
    }

    #[tokio::test]
    async fn test_unregistered_or_mismatched_service_is_rejected() {
        let adapter = ScriptedAdapter::new();
        let gateway = gateway_with(adapter.clone(), Duration::from_secs(1));

        let stranger = ServiceDescriptor::new("payments", "https://pay.example.com", "CRM");
        let result = gateway.invoke(CallRequest::new(stranger, "echo")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::VendorRejected));

        let spoofed = ServiceDescriptor::new("crm", "https://evil.example.com", "CRM");
        let result = gateway.invoke(CallRequest::new(spoofed, "echo")).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::VendorRejected));

        assert_eq!(adapter.calls(), 0);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let adapter = ScriptedAdapter::new();
        let result = ServiceGateway::builder(CredentialStore::new())
            .register(descriptor(), adapter.clone())
            .unwrap()
            .register(descriptor(), adapter);

        assert!(matches!(result, Err(GatewayError::DuplicateServiceError { .. })));
    }

    #[tokio::test]
    async fn test_request_helper_and_listing() {
        let gateway = gateway_with(ScriptedAdapter::new(), Duration::from_secs(2));

        let request = gateway.request("crm", "echo", Payload::new()).unwrap();
        assert_eq!(request.service, descriptor());
        assert!(gateway.request("missing", "echo", Payload::new()).is_none());

        let names: Vec<&str> = gateway.services().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["crm"]);
        assert_eq!(gateway.timeout_for("crm"), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_invoke_all_keeps_request_order() {
        let adapter = ScriptedAdapter::new();
        let gateway = Arc::new(gateway_with(adapter.clone(), Duration::from_secs(1)));

        let requests = vec![
            CallRequest::new(descriptor(), "sleep").with_param("ms", 60),
            CallRequest::new(descriptor(), "unauthorized"),
            CallRequest::new(descriptor(), "sleep").with_param("ms", 5),
        ];

        let results = gateway.invoke_all(requests).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], CallResult::success(json!({"slept": 60})));
        assert_eq!(results[1].error_kind(), Some(ErrorKind::AuthFailure));
        assert_eq!(results[2], CallResult::success(json!({"slept": 5})));
        assert_eq!(adapter.calls(), 3);
    }

    #[tokio::test]
    async fn test_adapter_panic_becomes_vendor_rejected() {
        let adapter = ScriptedAdapter::new();
        let gateway = Arc::new(gateway_with(adapter.clone(), Duration::from_secs(1)));

        let single = gateway.invoke(CallRequest::new(descriptor(), "explode")).await;
        match &single {
            CallResult::Failure { kind, message } => {
                assert_eq!(*kind, ErrorKind::VendorRejected);
                assert!(message.contains("adapter exploded"));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        let results = gateway
            .invoke_all(vec![
                CallRequest::new(descriptor(), "explode"),
                CallRequest::new(descriptor(), "echo").with_param("n", 1),
            ])
            .await;

        assert_eq!(results[0].error_kind(), Some(ErrorKind::VendorRejected));
        assert_eq!(results[1], CallResult::success(json!({"n": 1})));
        assert_eq!(adapter.calls(), 3);
    }
}
