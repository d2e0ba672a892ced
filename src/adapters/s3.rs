use crate::domain::credential::Credential;
use crate::domain::model::{Payload, ServiceDescriptor};
use crate::domain::ports::{AdapterError, ServiceAdapter};
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use serde_json::json;

/// AWS S3 (or any S3-compatible store) behind the gateway.
///
/// `base_url` of the descriptor is used as the endpoint with path-style
/// addressing, so MinIO and LocalStack work the same way as AWS.
#[derive(Debug, Clone)]
pub struct S3Adapter {
    region: String,
    default_bucket: Option<String>,
}

impl S3Adapter {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            default_bucket: None,
        }
    }

    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = Some(bucket.into());
        self
    }

    fn client_for(&self, service: &ServiceDescriptor, credential: &Credential) -> Result<S3Client, AdapterError> {
        let Credential::AccessKey {
            access_key_id,
            secret_access_key,
            session_token,
        } = credential
        else {
            return Err(AdapterError::Auth(format!(
                "access key required, found '{}'",
                credential.kind_name()
            )));
        };

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            session_token.clone(),
            None,
            "vendor-gateway",
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&service.base_url)
            .force_path_style(true)
            .build();

        Ok(S3Client::from_conf(config))
    }

    fn bucket<'a>(&'a self, payload: &'a Payload) -> Result<&'a str, AdapterError> {
        payload
            .get("bucket")
            .and_then(|v| v.as_str())
            .or(self.default_bucket.as_deref())
            .ok_or_else(|| AdapterError::InvalidRequest("missing 'bucket'".to_string()))
    }
}

fn required_str<'a>(payload: &'a Payload, key: &str) -> Result<&'a str, AdapterError> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AdapterError::InvalidRequest(format!("missing '{}'", key)))
}

/// S3 錯誤代碼分類
pub fn error_for_code(code: Option<&str>, status: u16, message: String) -> AdapterError {
    match code {
        Some("AccessDenied")
        | Some("InvalidAccessKeyId")
        | Some("SignatureDoesNotMatch")
        | Some("ExpiredToken") => AdapterError::Auth(message),
        Some("RequestTimeout") => AdapterError::Timeout(message),
        _ => AdapterError::Rejected { status, message },
    }
}

fn map_sdk_error<E>(err: SdkError<E, HttpResponse>) -> AdapterError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) => AdapterError::Timeout(message),
        SdkError::DispatchFailure(failure) if failure.is_timeout() => AdapterError::Timeout(message),
        SdkError::DispatchFailure(_) => AdapterError::Network(message),
        SdkError::ServiceError(service_err) => error_for_code(
            service_err.err().code(),
            service_err.raw().status().as_u16(),
            message,
        ),
        SdkError::ConstructionFailure(_) => AdapterError::InvalidRequest(message),
        _ => AdapterError::Network(message),
    }
}

#[async_trait]
impl ServiceAdapter for S3Adapter {
    fn vendor(&self) -> &str {
        "s3"
    }

    async fn call(
        &self,
        service: &ServiceDescriptor,
        credential: &Credential,
        operation: &str,
        payload: &Payload,
    ) -> Result<serde_json::Value, AdapterError> {
        let client = self.client_for(service, credential)?;
        let bucket = self.bucket(payload)?;

        tracing::debug!("🪣 {}: {} on bucket {}", service.name, operation, bucket);

        match operation {
            "list_objects" => {
                let prefix = payload.get("prefix").and_then(|v| v.as_str());
                let output = client
                    .list_objects_v2()
                    .bucket(bucket)
                    .set_prefix(prefix.map(str::to_string))
                    .send()
                    .await
                    .map_err(map_sdk_error)?;

                let objects: Vec<serde_json::Value> = output
                    .contents()
                    .iter()
                    .map(|object| json!({"key": object.key(), "size": object.size()}))
                    .collect();
                Ok(json!({ "bucket": bucket, "objects": objects }))
            }
            "get_object" => {
                let key = required_str(payload, "key")?;
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(map_sdk_error)?;

                let content_type = output.content_type().map(str::to_string);
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AdapterError::Network(e.to_string()))?
                    .into_bytes();

                Ok(json!({
                    "key": key,
                    "content_type": content_type,
                    "body": String::from_utf8_lossy(&bytes),
                }))
            }
            "put_object" => {
                let key = required_str(payload, "key")?;
                let body = match payload.get("body") {
                    Some(serde_json::Value::String(text)) => text.clone().into_bytes(),
                    Some(other) => other.to_string().into_bytes(),
                    None => return Err(AdapterError::InvalidRequest("missing 'body'".to_string())),
                };

                let output = client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map_err(map_sdk_error)?;

                Ok(json!({ "key": key, "e_tag": output.e_tag() }))
            }
            other => Err(AdapterError::InvalidRequest(format!(
                "unsupported S3 operation '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ErrorKind;

    #[test]
    fn test_error_for_code() {
        let kind = |code: Option<&str>, status| error_for_code(code, status, String::new()).kind();
        assert_eq!(kind(Some("AccessDenied"), 403), ErrorKind::AuthFailure);
        assert_eq!(kind(Some("InvalidAccessKeyId"), 403), ErrorKind::AuthFailure);
        assert_eq!(kind(Some("RequestTimeout"), 400), ErrorKind::Timeout);
        assert_eq!(kind(Some("NoSuchKey"), 404), ErrorKind::VendorRejected);
        assert_eq!(kind(None, 500), ErrorKind::VendorRejected);
    }

    #[test]
    fn test_bucket_falls_back_to_default() {
        let adapter = S3Adapter::new("us-east-1").with_default_bucket("uploads");
        let mut payload = Payload::new();
        assert_eq!(adapter.bucket(&payload).unwrap(), "uploads");

        payload.insert("bucket".to_string(), json!("avatars"));
        assert_eq!(adapter.bucket(&payload).unwrap(), "avatars");

        let bare = S3Adapter::new("us-east-1");
        assert!(bare.bucket(&Payload::new()).is_err());
    }

    #[tokio::test]
    async fn test_requires_access_key() {
        let adapter = S3Adapter::new("us-east-1");
        let service = ServiceDescriptor::new("s3", "http://127.0.0.1:9", "AWS");
        let err = adapter
            .call(&service, &Credential::ApiKey("k".into()), "list_objects", &Payload::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthFailure);
    }
}
