#[cfg(feature = "cli")]
pub mod cli;
pub mod gateway_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use gateway_config::{GatewayConfig, ServiceConfig};
