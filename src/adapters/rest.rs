use crate::domain::credential::Credential;
use crate::domain::model::{Payload, ServiceDescriptor};
use crate::domain::ports::{AdapterError, ServiceAdapter};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

const MAX_ERROR_BODY: usize = 512;

/// 憑證放在請求的哪個位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPlacement {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// Custom header such as `x-api-key`.
    Header(String),
    /// Query parameter such as `appid`.
    Query(String),
    /// HTTP basic auth. API keys are sent as the user with an empty password.
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    #[default]
    Json,
    Form,
}

/// Generic REST adapter: one instance per registered service.
#[derive(Debug, Clone)]
pub struct RestAdapter {
    client: Client,
    auth: AuthPlacement,
    headers: HashMap<String, String>,
    body: BodyEncoding,
}

impl RestAdapter {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            auth: AuthPlacement::Bearer,
            headers: HashMap::new(),
            body: BodyEncoding::Json,
        }
    }

    pub fn with_auth(mut self, auth: AuthPlacement) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body_encoding(mut self, body: BodyEncoding) -> Self {
        self.body = body;
        self
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    fn apply_auth(
        &self,
        request: RequestBuilder,
        credential: &Credential,
    ) -> Result<RequestBuilder, AdapterError> {
        let request = match (&self.auth, credential) {
            (AuthPlacement::Basic, Credential::ClientCredentials { client_id, client_secret }) => {
                request.basic_auth(client_id, Some(client_secret))
            }
            (AuthPlacement::Basic, _) => {
                let user = single_secret(credential)?;
                request.basic_auth(user, None::<&str>)
            }
            (AuthPlacement::Bearer, _) => request.bearer_auth(single_secret(credential)?),
            (AuthPlacement::Header(name), _) => request.header(name, single_secret(credential)?),
            (AuthPlacement::Query(name), _) => {
                request.query(&[(name.as_str(), single_secret(credential)?)])
            }
        };
        Ok(request)
    }
}

fn single_secret(credential: &Credential) -> Result<&str, AdapterError> {
    credential.token().ok_or_else(|| {
        AdapterError::Auth(format!(
            "credential of type '{}' cannot be sent as a single secret",
            credential.kind_name()
        ))
    })
}

/// 解析 "POST /v1/charges" 或 "/weather" (預設 GET)
pub fn parse_operation(operation: &str) -> Result<(Method, &str), AdapterError> {
    const METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

    let operation = operation.trim();
    match operation.split_once(char::is_whitespace) {
        Some((verb, path)) => {
            let verb = verb.to_ascii_uppercase();
            if !METHODS.contains(&verb.as_str()) {
                return Err(AdapterError::InvalidRequest(format!(
                    "unsupported HTTP method '{}' in operation '{}'",
                    verb, operation
                )));
            }
            let method = Method::from_bytes(verb.as_bytes())
                .map_err(|e| AdapterError::InvalidRequest(e.to_string()))?;
            Ok((method, path.trim()))
        }
        None => {
            let verb = operation.to_ascii_uppercase();
            if METHODS.contains(&verb.as_str()) {
                let method = Method::from_bytes(verb.as_bytes())
                    .map_err(|e| AdapterError::InvalidRequest(e.to_string()))?;
                Ok((method, ""))
            } else {
                Ok((Method::GET, operation))
            }
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"))
}

fn value_to_param(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 單一路徑片段：`/`、`?`、`#` 等字元一律編碼，`.` 與 `..` 不允許
fn value_to_segment(value: &serde_json::Value) -> Result<String, String> {
    let raw = value_to_param(value);
    if raw.is_empty() || raw == "." || raw == ".." {
        return Err(raw);
    }
    Ok(urlencoding::encode(&raw).into_owned())
}

/// 以 payload 填入路徑中的 `{name}`，回傳路徑與剩餘參數
pub fn fill_path_template(path: &str, payload: &Payload) -> Result<(String, Payload), AdapterError> {
    let mut remaining = payload.clone();
    let mut missing = Vec::new();
    let mut invalid = Vec::new();

    let filled = placeholder_regex().replace_all(path, |caps: &regex::Captures| {
        let key = &caps[1];
        match payload.get(key).map(value_to_segment) {
            Some(Ok(segment)) => {
                remaining.remove(key);
                segment
            }
            Some(Err(raw)) => {
                invalid.push(format!("{}={:?}", key, raw));
                caps[0].to_string()
            }
            None => {
                missing.push(key.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(AdapterError::InvalidRequest(format!(
            "unresolved path parameters {:?} in '{}'",
            missing, path
        )));
    }

    if !invalid.is_empty() {
        return Err(AdapterError::InvalidRequest(format!(
            "path parameters cannot be empty or dot segments: {}",
            invalid.join(", ")
        )));
    }

    Ok((filled.into_owned(), remaining))
}

pub fn build_url(base_url: &str, path: &str) -> Result<Url, AdapterError> {
    let joined = if path.is_empty() {
        base_url.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    };
    Url::parse(&joined).map_err(|e| AdapterError::InvalidRequest(format!("{}: {}", joined, e)))
}

fn to_pairs(payload: &Payload) -> Vec<(String, String)> {
    payload
        .iter()
        .map(|(key, value)| (key.clone(), value_to_param(value)))
        .collect()
}

/// 回應主體原封不動轉為 JSON 值
pub(crate) async fn read_response(
    response: reqwest::Response,
) -> Result<serde_json::Value, AdapterError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let mut body = text;
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(AdapterError::from_status(status.as_u16(), body));
    }

    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(serde_json::Value::String(text)),
    }
}

#[async_trait]
impl ServiceAdapter for RestAdapter {
    fn vendor(&self) -> &str {
        "rest"
    }

    async fn call(
        &self,
        service: &ServiceDescriptor,
        credential: &Credential,
        operation: &str,
        payload: &Payload,
    ) -> Result<serde_json::Value, AdapterError> {
        let (method, path) = parse_operation(operation)?;
        let (path, remaining) = fill_path_template(path, payload)?;
        let url = build_url(&service.base_url, &path)?;

        tracing::debug!("📡 {}: {} {}", service.name, method, url);

        let sends_body = method == Method::POST || method == Method::PUT || method == Method::PATCH;
        let mut request = self.client.request(method, url);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        request = self.apply_auth(request, credential)?;

        if sends_body {
            request = match self.body {
                BodyEncoding::Json => request.json(&serde_json::Value::Object(remaining)),
                BodyEncoding::Form => request.form(&to_pairs(&remaining)),
            };
        } else if !remaining.is_empty() {
            request = request.query(&to_pairs(&remaining));
        }

        let response = request.send().await?;
        tracing::debug!("📡 {}: response status {}", service.name, response.status());

        read_response(response).await
    }
}
