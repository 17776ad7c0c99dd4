use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `level`; `verbose`
/// raises the default to debug. With `log_file`, logs are appended there
/// instead of stderr.
pub fn init(level: &str, verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), level, verbose)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e)),
    }
}

/// A non-empty `env` directive string wins; otherwise `level`, or debug when verbose
fn build_filter(env: Option<&str>, level: &str, verbose: bool) -> Result<EnvFilter> {
    if let Some(directives) = env.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid {} '{}'", EnvFilter::DEFAULT_ENV, directives));
    }
    let default_level = if verbose { "debug" } else { level };
    EnvFilter::try_new(default_level).with_context(|| format!("Invalid log level '{}'", default_level))
}
