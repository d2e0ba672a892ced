pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use crate::app::build_gateway;
pub use config::GatewayConfig;
pub use crate::core::{
    CallRequest, CallResult, Credential, CredentialStore, ErrorKind, Payload, ServiceDescriptor,
    ServiceGateway,
};
pub use utils::error::{GatewayError, Result};
