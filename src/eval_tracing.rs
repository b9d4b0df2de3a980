use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_DIRECTIVE: &str = "mt_chat_eval=info";

/// Configures tracing for the app
///
/// Logs go to a daily rotating file in `log_dir` and, compacted, to stderr. `RUST_LOG` overrides
/// the default filter.
pub fn init(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "mt-chat-eval.log");

    let env_filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(
            std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_DIRECTIVE.into()),
        );

    let file_layer = fmt::layer()
        .compact()
        .with_ansi(false)
        .with_writer(file_appender);

    let stderr_layer = fmt::layer()
        .compact()
        .without_time()
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter_layer)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}
