use std::path::PathBuf;
use std::time::Instant;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// When set, a JSON copy of every event is written to `fsrcnn.log` here.
    pub log_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Some(LogFormat::Compact),
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: Level::INFO,
            format: LogFormat::Compact,
            log_directory: None,
        }
    }
}

impl LogConfig {
    /// Maps a `-v` count onto a level: 0 is INFO, 1 DEBUG, 2 or more TRACE.
    pub fn with_verbosity(mut self, occurrences: u64) -> Self {
        self.level = match occurrences {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        self
    }
}

/// Initialize the logging system.
///
/// The returned guard flushes the file log when dropped and must be kept
/// alive for as long as the program logs.
pub fn init_logging(config: LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(config.level.into());

    let fmt_layer = match config.format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    match config.log_directory {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = rolling::never(&log_dir, "fsrcnn.log");
            let (writer, guard) = non_blocking(file_appender);
            let file_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false);
            subscriber.with(file_layer).try_init()?;
            Ok(Some(guard))
        }
        None => {
            subscriber.try_init()?;
            Ok(None)
        }
    }
}

/// Logs the start and the elapsed time of one mode of the program.
pub struct OperationLogger {
    operation: String,
    start_time: Instant,
}

impl OperationLogger {
    pub fn new(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        tracing::info!(operation = %operation, "Operation started");

        OperationLogger {
            operation,
            start_time: Instant::now(),
        }
    }

    pub fn log_error(&self, error: &dyn std::error::Error) {
        tracing::error!(
            operation = %self.operation,
            elapsed_ms = self.start_time.elapsed().as_millis() as u64,
            error = %error,
            "Operation failed"
        );
    }

    pub fn complete(self) {
        tracing::info!(
            operation = %self.operation,
            elapsed_ms = self.start_time.elapsed().as_millis() as u64,
            "Operation completed"
        );
    }
}
