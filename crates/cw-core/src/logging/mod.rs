pub mod config;
pub mod file_writer;
pub mod formatter;

pub use config::LoggingConfig;
pub use formatter::LogFormat;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Installs the global tracing subscriber for this process.
///
/// Console and file outputs are independent layers; the file layer never
/// uses ANSI colors and timestamps in RFC 3339 UTC. `RUST_LOG` overrides
/// the configured level when set.
pub fn init(config: LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![env_filter.boxed()];

    if config.console {
        let layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true);
        layers.push(match config.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        });
    }

    if let Some(path) = &config.file {
        let writer = file_writer::FileWriter::new(path.clone());
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_timer(fmt::time::ChronoUtc::rfc_3339());
        layers.push(match config.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        });
    }

    Registry::default().with(layers).init();
    Ok(())
}

/// Installs logging with the environment-driven default configuration
pub fn init_default() -> Result<()> {
    init(LoggingConfig::default())
}

/// Installs logging from the environment with caller-supplied overrides
/// taking precedence
pub fn init_from_env(log_level: Option<String>, log_file: Option<PathBuf>) -> Result<()> {
    let mut config = LoggingConfig::default();
    if let Some(level) = log_level {
        config.level = level;
    }
    if let Some(file) = log_file {
        config.file = Some(file);
    }
    init(config)
}
