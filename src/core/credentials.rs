use crate::config::gateway_config::GatewayConfig;
use crate::domain::credential::Credential;
use std::collections::HashMap;

/// Per-service credentials, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<String, Credential>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, credential_ref: impl Into<String>, credential: Credential) -> Self {
        self.entries.insert(credential_ref.into(), credential);
        self
    }

    /// 依命名慣例從環境變數讀取：`<REF>_ACCESS_KEY_ID`、`<REF>_CLIENT_ID`、`<REF>_TOKEN`、`<REF>_API_KEY`
    pub fn from_env<'a>(refs: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_lookup(refs, |name| std::env::var(name).ok())
    }

    /// Same as [`CredentialStore::from_env`] with an injectable variable source.
    pub fn from_lookup<'a, F>(refs: impl IntoIterator<Item = &'a str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut entries = HashMap::new();
        for credential_ref in refs {
            if let Some(credential) = resolve(credential_ref, &lookup) {
                entries.insert(credential_ref.to_string(), credential);
            }
        }
        Self { entries }
    }

    /// 設定檔內的憑證優先，其次才是環境變數
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::from_config_with_lookup(config, |name| std::env::var(name).ok())
    }

    pub fn from_config_with_lookup<F>(config: &GatewayConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let refs: Vec<&str> = config
            .services
            .iter()
            .map(|s| s.credential_ref.as_str())
            .collect();
        let mut store = Self::from_lookup(refs, lookup);

        for (credential_ref, inline) in &config.credentials {
            if let Some(credential) = inline.to_credential() {
                store.entries.insert(credential_ref.clone(), credential);
            }
        }

        tracing::debug!("🔐 Loaded credentials for {} reference(s)", store.len());
        store
    }

    pub fn get(&self, credential_ref: &str) -> Option<&Credential> {
        self.entries.get(credential_ref)
    }

    pub fn contains(&self, credential_ref: &str) -> bool {
        self.entries.contains_key(credential_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn resolve<F>(credential_ref: &str, lookup: &F) -> Option<Credential>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        lookup(&format!("{}_{}", credential_ref, suffix)).filter(|v| !v.trim().is_empty())
    };

    if let (Some(access_key_id), Some(secret_access_key)) =
        (var("ACCESS_KEY_ID"), var("SECRET_ACCESS_KEY"))
    {
        return Some(Credential::AccessKey {
            access_key_id,
            secret_access_key,
            session_token: var("SESSION_TOKEN"),
        });
    }

    if let (Some(client_id), Some(client_secret)) = (var("CLIENT_ID"), var("CLIENT_SECRET")) {
        return Some(Credential::ClientCredentials {
            client_id,
            client_secret,
        });
    }

    if let Some(token) = var("TOKEN") {
        return Some(Credential::Bearer(token));
    }

    var("API_KEY").map(Credential::ApiKey)
}
