// Path: crates/telemetry/src/init.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or blank.
///
/// Contract output from the `debug` host import is logged under the `wasm`
/// target at debug level, so it is hidden unless a caller opts in.
pub const DEFAULT_DIRECTIVES: &str = "info,wasm=info,ibc=info,snapshot=info,storage=warn";

fn select_directives(env: Option<String>, fallback: &str) -> String {
    env.filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Initializes the global `tracing` subscriber for structured JSON logging.
///
/// `RUST_LOG` takes precedence over `default_directives`. Records emitted
/// through the `log` facade are forwarded into `tracing`. Calling this after a
/// global subscriber is installed is a no-op, so test binaries can call it
/// from every test.
pub fn init_tracing(default_directives: &str) -> Result<(), anyhow::Error> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }
    let directives = select_directives(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default_directives);
    let filter = EnvFilter::try_new(&directives)?;
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let subscriber = Registry::default().with(filter).with(fmt_layer);

    // Another subscriber may win a race with the check above.
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return Ok(());
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!(error = %e, "log facade already has a logger");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_directives_win_unless_blank() {
        assert_eq!(select_directives(Some("wasm=trace".into()), "info"), "wasm=trace");
        assert_eq!(select_directives(Some("  ".into()), "info"), "info");
        assert_eq!(select_directives(None, DEFAULT_DIRECTIVES), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
        assert!(EnvFilter::try_new("wasm=notalevel").is_err());
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(DEFAULT_DIRECTIVES).unwrap();
        init_tracing("debug").unwrap();
        assert!(tracing::dispatcher::has_been_set());
    }
}
