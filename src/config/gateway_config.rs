use crate::adapters::rest::{AuthPlacement, BodyEncoding};
use crate::domain::credential::Credential;
use crate::domain::model::ServiceDescriptor;
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_unique_names,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub credentials: HashMap<String, CredentialConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewaySettings {
    pub default_timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    Rest,
    OauthClientCredentials,
    S3,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Rest => "rest",
            AdapterKind::OauthClientCredentials => "oauth_client_credentials",
            AdapterKind::S3 => "s3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Bearer,
    Header,
    Query,
    Basic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub scheme: AuthScheme,
    pub name: Option<String>, // header 或 query 參數名稱
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub base_url: String,
    pub credential_ref: String,
    #[serde(default)]
    pub adapter: AdapterKind,
    pub enabled: Option<bool>,
    pub timeout_seconds: Option<u64>,
    pub auth: Option<AuthConfig>,
    pub headers: Option<HashMap<String, String>>,
    pub body: Option<BodyEncoding>,
    // oauth_client_credentials
    pub token_path: Option<String>,
    pub token_encoding: Option<BodyEncoding>,
    pub audience: Option<String>,
    pub scope: Option<String>,
    // s3
    pub region: Option<String>,
    pub bucket: Option<String>,
}

/// Inline credentials, normally filled from `${VAR}` references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub api_key: Option<String>,
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"))
}

/// 未替換的 `${VAR}` 或空字串都當作沒有設定
fn usable(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && !env_var_regex().is_match(v))
        .map(str::to_string)
}

impl CredentialConfig {
    pub fn to_credential(&self) -> Option<Credential> {
        if let (Some(access_key_id), Some(secret_access_key)) =
            (usable(&self.access_key_id), usable(&self.secret_access_key))
        {
            return Some(Credential::AccessKey {
                access_key_id,
                secret_access_key,
                session_token: usable(&self.session_token),
            });
        }

        if let (Some(client_id), Some(client_secret)) =
            (usable(&self.client_id), usable(&self.client_secret))
        {
            return Some(Credential::ClientCredentials {
                client_id,
                client_secret,
            });
        }

        if let Some(token) = usable(&self.token) {
            return Some(Credential::Bearer(token));
        }

        usable(&self.api_key).map(Credential::ApiKey)
    }
}

impl ServiceConfig {
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(&self.name, &self.base_url, &self.credential_ref)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn auth_placement(&self) -> Result<AuthPlacement> {
        let Some(auth) = &self.auth else {
            return Ok(AuthPlacement::Bearer);
        };

        let field = format!("services.{}.auth.name", self.name);
        let placement = match auth.scheme {
            AuthScheme::Bearer => AuthPlacement::Bearer,
            AuthScheme::Basic => AuthPlacement::Basic,
            AuthScheme::Header => {
                let name = validate_required_field(&field, &auth.name)?;
                validate_non_empty_string(&field, name)?;
                AuthPlacement::Header(name.clone())
            }
            AuthScheme::Query => {
                let name = validate_required_field(&field, &auth.name)?;
                validate_non_empty_string(&field, name)?;
                AuthPlacement::Query(name.clone())
            }
        };
        Ok(placement)
    }

    fn validate_service(&self) -> Result<()> {
        validate_non_empty_string("services.name", &self.name)?;
        validate_url(&format!("services.{}.base_url", self.name), &self.base_url)?;
        validate_non_empty_string(
            &format!("services.{}.credential_ref", self.name),
            &self.credential_ref,
        )?;

        if let Some(timeout) = self.timeout_seconds {
            validate_range(
                &format!("services.{}.timeout_seconds", self.name),
                timeout,
                1,
                MAX_TIMEOUT_SECONDS,
            )?;
        }

        self.auth_placement()?;

        if self.adapter == AdapterKind::OauthClientCredentials {
            let field = format!("services.{}.token_path", self.name);
            let token_path = validate_required_field(&field, &self.token_path)?;
            validate_non_empty_string(&field, token_path)?;
        }

        Ok(())
    }
}

impl GatewayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GatewayError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_toml_str_with_lookup(content, |name| std::env::var(name).ok())
    }

    /// 先解析 TOML，再替換字串值裡的 `${VAR}`，變數內容不會被當成 TOML 語法
    pub fn from_toml_str_with_lookup<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_error = |message: String| GatewayError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", message),
        };

        let table: toml::Table = content.parse().map_err(|e| parse_error(format!("{}", e)))?;
        let mut value = toml::Value::Table(table);
        Self::substitute_env_vars(&mut value, &lookup);

        value.try_into().map_err(|e| parse_error(format!("{}", e)))
    }

    /// 替換環境變數 (例如 ${STRIPE_API_KEY})，未設定者保留原樣
    fn substitute_env_vars<F>(value: &mut toml::Value, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        match value {
            toml::Value::String(text) => {
                if env_var_regex().is_match(text) {
                    *text = env_var_regex()
                        .replace_all(text, |caps: &regex::Captures| {
                            let var_name = &caps[1];
                            lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
                        })
                        .into_owned();
                }
            }
            toml::Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::substitute_env_vars(item, lookup);
                }
            }
            toml::Value::Table(table) => {
                for (_, item) in table.iter_mut() {
                    Self::substitute_env_vars(item, lookup);
                }
            }
            _ => {}
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(GatewayError::MissingConfigError {
                field: "services".to_string(),
            });
        }

        if let Some(timeout) = self.gateway.default_timeout_seconds {
            validate_range(
                "gateway.default_timeout_seconds",
                timeout,
                1,
                MAX_TIMEOUT_SECONDS,
            )?;
        }

        validate_unique_names("services.name", self.services.iter().map(|s| s.name.as_str()))?;

        // 停用的服務可能還沒有對應的環境變數，略過其餘檢查
        for service in self.enabled_services() {
            service.validate_service()?;
        }

        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(
            self.gateway
                .default_timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    pub fn timeout_for(&self, service: &ServiceConfig) -> Duration {
        service
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.default_timeout())
    }

    pub fn user_agent(&self) -> &str {
        self.gateway
            .user_agent
            .as_deref()
            .unwrap_or(concat!("vendor-gateway/", env!("CARGO_PKG_VERSION")))
    }

    pub fn get_service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn enabled_services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter().filter(|s| s.is_enabled())
    }
}

impl Validate for GatewayConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
