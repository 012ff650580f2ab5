//! Structured logging setup using tracing
//!
//! Console output on stderr plus an optional JSON file layer, both filtered
//! by the same `EnvFilter` (`RUST_LOG` when set, otherwise `tidemark=<level>`).

use crate::config::LoggingConfig;
use crate::domain::{Result, TidemarkError};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "tidemark.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes the file writer when dropped
///
/// Hold it until the process exits; buffered lines are lost otherwise.
#[must_use]
pub struct LoggingGuard {
    _writer: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns a configuration error for an unknown level or a log directory
/// that cannot be created, and [`TidemarkError::Other`] when a global
/// subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use tidemark::config::LoggingConfig;
/// use tidemark::logging::init_logging;
///
/// let config = LoggingConfig { local_enabled: false, ..LoggingConfig::default() };
/// let _guard = init_logging("debug", &config)?;
/// # Ok::<(), tidemark::domain::TidemarkError>(())
/// ```
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidemark={level}")));

    let console: BoxedLayer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter.clone())
        .boxed();

    let mut layers = vec![console];
    let writer = if config.local_enabled {
        let (file, guard) = file_layer(config, filter)?;
        layers.push(file);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| TidemarkError::Other(format!("Logging already initialized: {e}")))?;

    tracing::debug!(
        %level,
        file = config.local_enabled,
        path = %config.local_path,
        rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard { _writer: writer })
}

/// JSON lines into a rolling file under `local_path`
fn file_layer(config: &LoggingConfig, filter: EnvFilter) -> Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        TidemarkError::Configuration(format!(
            "Cannot create log directory '{}': {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation(&config.local_rotation),
        &config.local_path,
        LOG_FILE_PREFIX,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(writer)
        .with_filter(filter)
        .boxed();

    Ok((layer, guard))
}

fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn parse_level(name: &str) -> Result<Level> {
    name.parse::<Level>().map_err(|_| {
        TidemarkError::Configuration(format!(
            "Invalid log level '{name}' (expected trace, debug, info, warn or error)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("trace", Level::TRACE)]
    #[test_case("DEBUG", Level::DEBUG)]
    #[test_case("Info", Level::INFO)]
    #[test_case("warn", Level::WARN)]
    #[test_case("error", Level::ERROR)]
    fn test_parse_level(name: &str, expected: Level) {
        assert_eq!(parse_level(name).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("loud" ; "unknown")]
    fn test_parse_level_rejects(name: &str) {
        let err = parse_level(name).unwrap_err();
        assert!(matches!(err, TidemarkError::Configuration(_)));
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test_case("hourly", Rotation::HOURLY)]
    #[test_case("never", Rotation::NEVER)]
    #[test_case("daily", Rotation::DAILY)]
    fn test_rotation(name: &str, expected: Rotation) {
        assert_eq!(rotation(name), expected);
    }

    #[test]
    fn test_init_logging_rejects_bad_level() {
        let config = LoggingConfig {
            local_enabled: false,
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging("loud", &config),
            Err(TidemarkError::Configuration(_))
        ));
    }
}
