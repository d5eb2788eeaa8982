use std::fmt;
use std::fmt::Write;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{prelude::*, EnvFilter};

use super::app_config::config;
use super::error::Result;

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
    pub use tracing::{event, instrument, span};
}

/// This needs to be hold in main
pub struct GlobalLoggingContext {
    _worker_guards: Vec<WorkerGuard>,
}

/// Basic setup: stderr output filtered from config directives and RUST_LOG,
/// plus an optional rolling file appender.
pub fn setup() -> Result<GlobalLoggingContext> {
    let cfg: LoggingConfig = config().get("logging").unwrap_or_default();

    let mut guards = Vec::new();

    let (term_writer, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(std::io::stderr());
    guards.push(guard);

    let term_layer = tracing_subscriber::fmt::Layer::default()
        .with_target(false)
        .with_timer(ISOTimeFormat)
        .with_writer(term_writer);

    let file_layer = match &cfg.file {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking::NonBlockingBuilder::default()
                .lossy(false)
                .finish(tracing_appender::rolling::RollingFileAppender::new(
                    Rotation::NEVER,
                    &file.directory,
                    &file.name,
                ));
            guards.push(guard);
            let layer = tracing_subscriber::fmt::Layer::default()
                .with_ansi(false)
                .with_target(false)
                .with_timer(ISOTimeFormat)
                .with_writer(writer);
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(cfg.to_env_filter())
        .with(term_layer)
        .with(file_layer)
        .try_init()?;

    Ok(GlobalLoggingContext { _worker_guards: guards })
}

struct ISOTimeFormat;

impl FormatTime for ISOTimeFormat {
    fn format_time(&self, w: &mut dyn Write) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ====== Logging Config ======

#[derive(Debug, serde::Deserialize)]
struct LoggingConfig {
    #[serde(default)]
    directives: Option<String>,
    #[serde(default)]
    from_env: Option<String>,
    #[serde(default)]
    file: Option<FileOutput>,
}

#[derive(Debug, serde::Deserialize)]
struct FileOutput {
    directory: PathBuf,
    name: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directives: Some("info".into()),
            from_env: Some("RUST_LOG".into()),
            file: None,
        }
    }
}

impl LoggingConfig {
    fn to_env_filter(&self) -> EnvFilter {
        let filter = match &self.from_env {
            Some(env) => EnvFilter::from_env(env),
            None => EnvFilter::default(),
        };

        if let Some(dirs) = &self.directives {
            dirs.split(',')
                .filter_map(|s| match s.parse() {
                    Ok(d) => Some(d),
                    Err(err) => {
                        eprintln!("ignoring `{}`: {}", s, err);
                        None
                    }
                })
                .fold(filter, |f, dir| f.add_directive(dir))
        } else {
            filter
        }
    }
}
