//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. [`init_logging`] builds one from a [`LoggingConfig`].

use crate::config::LoggingConfig;
use crate::error::{InformError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install a global subscriber built from `config`.
///
/// `RUST_LOG` takes precedence over the configured level when set. The
/// returned guard flushes the file writer and must be kept alive for as long
/// as file logging is wanted.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if config.log_to_console {
        layers.push(output_layer(config.json_format, std::io::stderr));
    }

    if config.log_to_file {
        let path = config.log_file_path.as_deref().ok_or_else(|| {
            InformError::ConfigError("log_file_path must be set when log_to_file is true".into())
        })?;
        let path = Path::new(path);
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
        let file_name = path.file_name().ok_or_else(|| {
            InformError::ConfigError(format!("log file path has no file name: {}", path.display()))
        })?;

        let appender =
            tracing_appender::rolling::never(directory.unwrap_or(Path::new(".")), file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(output_layer(config.json_format, writer));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| InformError::ConfigError(format!("failed to install subscriber: {e}")))?;

    Ok(guard)
}

fn output_layer<W>(json: bool, writer: W) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(writer).boxed()
    }
}
