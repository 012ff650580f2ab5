//! Logging and observability
//!
//! Structured logging through `tracing`: a console layer, an optional JSON
//! file layer with rotation, and a few macros that keep the fields of
//! recurring poll events consistent.
//!
//! # Example
//!
//! ```no_run
//! use tidemark::logging::init_logging;
//! use tidemark::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(stream = "orders", "Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a poll invocation
///
/// # Example
///
/// ```no_run
/// use tidemark::log_poll_start;
/// use tidemark::core::state::Watermark;
///
/// log_poll_start!("orders", Watermark::new(1000, 0));
/// ```
#[macro_export]
macro_rules! log_poll_start {
    ($stream:expr, $watermark:expr) => {
        tracing::debug!(
            stream = %$stream,
            watermark = %$watermark,
            "Starting poll"
        );
    };
}

/// Log the completion of a poll invocation
///
/// # Example
///
/// ```no_run
/// use tidemark::log_poll_complete;
/// use std::time::Duration;
///
/// log_poll_complete!("orders", 42u64, Duration::from_millis(180));
/// ```
#[macro_export]
macro_rules! log_poll_complete {
    ($stream:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            stream = %$stream,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Poll completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use tidemark::log_error_with_context;
/// use tidemark::domain::TidemarkError;
///
/// let error = TidemarkError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            retryable = $error.is_retryable(),
            context = $context,
            "Error occurred"
        );
    };
}
