use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "vendor-gateway")]
#[command(about = "Call third-party services through one uniform gateway")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List registered services and whether their credentials are present
    Services,

    /// Validate the configuration file
    Check,

    /// Invoke one operation on one service
    Call {
        #[arg(short, long)]
        service: String,

        /// e.g. "GET /data/2.5/weather" or "list_objects"
        #[arg(short, long)]
        operation: String,

        /// JSON object with call parameters
        #[arg(short, long)]
        payload: Option<String>,
    },
}
