use std::fmt;

/// Opaque secret used to authenticate with one vendor.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Bearer(String),
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    AccessKey {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
}

impl Credential {
    /// 可放入 Authorization: Bearer 的單一秘密
    pub fn token(&self) -> Option<&str> {
        match self {
            Credential::ApiKey(key) => Some(key),
            Credential::Bearer(token) => Some(token),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Credential::ApiKey(_) => "api_key",
            Credential::Bearer(_) => "bearer",
            Credential::ClientCredentials { .. } => "client_credentials",
            Credential::AccessKey { .. } => "access_key",
        }
    }
}

// 秘密值一律不輸出到日誌
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credential::Bearer(_) => f.write_str("Bearer(***)"),
            Credential::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
            Credential::AccessKey {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("AccessKey")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"***")
                .field("session_token", &session_token.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}
