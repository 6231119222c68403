use std::fs::{File, OpenOptions};
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Initialize structured logging based on configuration
///
/// JSON output for production, pretty output for development. `RUST_LOG`
/// takes precedence over the configured level when set.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let configured = level_filter(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(configured);

    let registry = tracing_subscriber::registry().with(env_filter);
    let file = open_log_file(config.file_path.as_deref())?;

    if config.format == "json" {
        let json_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_line_number(true)
            .with_file(true);

        match file {
            Some(file) => registry.with(json_layer.with_writer(file)).try_init()?,
            None => registry.with(json_layer).try_init()?,
        }
    } else {
        let pretty_layer = fmt::layer().pretty().with_target(true).with_line_number(true);

        match file {
            Some(file) => registry
                .with(pretty_layer.with_ansi(false).with_writer(file))
                .try_init()?,
            None => registry.with(pretty_layer).try_init()?,
        }
    }

    Ok(())
}

/// Filter passing every event at or above the configured level.
///
/// Built from the parsed `Level` rather than the raw string: `EnvFilter`
/// reads an unknown word such as "warning" as a target name and drops
/// everything else.
pub fn level_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let level = parse_log_level(level)?;
    Ok(EnvFilter::default().add_directive(LevelFilter::from_level(level).into()))
}

fn open_log_file(path: Option<&str>) -> anyhow::Result<Option<Arc<File>>> {
    path.map(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(Arc::new)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {path}: {e}"))
    })
    .transpose()
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
