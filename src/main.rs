use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::time::Instant;
use vendor_gateway::utils::error::ErrorSeverity;
use vendor_gateway::utils::{logger, validation::Validate};
use vendor_gateway::{
    build_gateway, CallResult, CliConfig, Command, GatewayConfig, GatewayError, Payload,
};

#[derive(Serialize)]
struct CallReport<'a> {
    service: &'a str,
    operation: &'a str,
    started_at: DateTime<Utc>,
    elapsed_ms: u128,
    result: &'a CallResult,
}

fn exit_code_for(error: &GatewayError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium | ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(error: GatewayError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    eprintln!("❌ {}", error.user_friendly_message());
    eprintln!("💡 Suggestion: {}", error.recovery_suggestion());
    std::process::exit(exit_code_for(&error));
}

fn parse_payload(raw: Option<&str>) -> Result<Payload, GatewayError> {
    let Some(raw) = raw else {
        return Ok(Payload::new());
    };

    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(GatewayError::InvalidConfigValueError {
            field: "--payload".to_string(),
            value: other.to_string(),
            reason: "payload must be a JSON object".to_string(),
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("📁 Loading configuration from: {}", cli.config);
    let config = GatewayConfig::from_file(&cli.config).unwrap_or_else(|e| fail(e));

    if let Err(e) = config.validate() {
        fail(e);
    }

    match &cli.command {
        Command::Check => {
            println!(
                "✅ Configuration '{}' is valid ({} service(s))",
                cli.config,
                config.services.len()
            );
        }
        Command::Services => {
            let gateway = build_gateway(&config).unwrap_or_else(|e| fail(e));
            for descriptor in gateway.services() {
                let credentials = if gateway.has_credentials(descriptor) {
                    "credentials: ok"
                } else {
                    "credentials: MISSING"
                };
                println!(
                    "{:<16} {:<40} {} ({})",
                    descriptor.name, descriptor.base_url, descriptor.credential_ref, credentials
                );
            }
        }
        Command::Call {
            service,
            operation,
            payload,
        } => {
            let payload = parse_payload(payload.as_deref()).unwrap_or_else(|e| fail(e));
            let gateway = build_gateway(&config).unwrap_or_else(|e| fail(e));

            let Some(request) = gateway.request(service, operation.as_str(), payload) else {
                fail(GatewayError::config(format!(
                    "service '{}' is not defined or not enabled",
                    service
                )));
            };

            let started_at = Utc::now();
            let started = Instant::now();
            let result = gateway.invoke(request).await;

            let report = CallReport {
                service,
                operation,
                started_at,
                elapsed_ms: started.elapsed().as_millis(),
                result: &result,
            };
            let rendered =
                serde_json::to_string_pretty(&report).context("failed to render call report")?;
            println!("{}", rendered);

            if let CallResult::Failure { kind, message } = &result {
                eprintln!("❌ {}: {}", kind, message);
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
