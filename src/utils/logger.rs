use std::io::Stderr;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self, format::DefaultFields, format::Format};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "vendor_gateway=debug,info"
    } else {
        "vendor_gateway=info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

// 日誌寫到 stderr，stdout 留給 JSON 報告
fn base_layer<S>() -> fmt::Layer<S, DefaultFields, Format, fn() -> Stderr>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr as fn() -> Stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

pub fn init_cli_logger(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(base_layer().compact())
        .try_init();
}

pub fn init_json_logger() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(false))
        .with(base_layer().json()) // structured output for log collectors
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(true), "vendor_gateway=debug,info");
        assert_eq!(default_directives(false), "vendor_gateway=info");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_cli_logger(false);
        init_json_logger();
        tracing::info!("📁 logger ready");
    }
}
