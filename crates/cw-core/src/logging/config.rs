use crate::logging::formatter::LogFormat;
use std::path::PathBuf;

/// Logging configuration.
///
/// The default reads `RUST_LOG`, `CALLWEAVE_LOG_FILE` and
/// `CALLWEAVE_LOG_FORMAT`; embedders can override any field before
/// calling `logging::init`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive when `RUST_LOG` is unset (error, warn, info,
    /// debug, trace)
    pub level: String,
    /// Log file path; None disables file output
    pub file: Option<PathBuf>,
    /// Mirror log lines to the console
    pub console: bool,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            file: std::env::var("CALLWEAVE_LOG_FILE").ok().map(PathBuf::from),
            console: true,
            format: LogFormat::from_env(),
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// File-only output, for embedding where stdout belongs to the host
    pub fn quiet(mut self) -> Self {
        self.console = false;
        self
    }
}
