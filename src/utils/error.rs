use thiserror::Error;

/// 建構期錯誤：設定解析、驗證與服務註冊。
/// 呼叫期的失敗一律以 `CallResult::Failure` 回報，不經過這裡。
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Service '{name}' is already registered")]
    DuplicateServiceError { name: String },

    #[error("Unsupported adapter '{adapter}' for service '{service}'")]
    UnsupportedAdapterError { service: String, adapter: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Registration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GatewayError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::DuplicateServiceError { .. } | Self::UnsupportedAdapterError { .. } => {
                ErrorCategory::Registration
            }
            Self::IoError(_) | Self::SerializationError(_) | Self::HttpClientError(_) => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Registration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("Could not read a required file: {}", e),
            Self::MissingConfigError { field } => {
                format!("The configuration is missing '{}'", field)
            }
            Self::DuplicateServiceError { name } => {
                format!("Service '{}' is defined more than once", name)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => "Check that the configuration file exists and is readable",
            Self::SerializationError(_) => "Check that the payload is a valid JSON object",
            Self::HttpClientError(_) => "Check the TLS setup of the host",
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Fix the configuration file and run `check` again"
            }
            Self::InvalidConfigValueError { .. } => "Correct the highlighted value",
            Self::MissingConfigError { .. } => "Add the missing field to the configuration",
            Self::DuplicateServiceError { .. } => "Give every service a unique name",
            Self::UnsupportedAdapterError { .. } => {
                "Use one of: rest, oauth_client_credentials, s3 (requires the `s3` feature)"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = GatewayError::DuplicateServiceError {
            name: "stripe".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Registration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("stripe"));

        let io = GatewayError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(io.category(), ErrorCategory::System);
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }
}
