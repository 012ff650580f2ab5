//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TidemarkConfig;
use super::secret::secret_string;
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Prefix of every override variable
pub const ENV_PREFIX: &str = "TIDEMARK";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TidemarkConfig
/// 4. Applies environment variable overrides (TIDEMARK_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns a configuration error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use tidemark::config::loader::load_config;
///
/// let config = load_config("tidemark.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TidemarkConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TidemarkError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TidemarkError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Loads configuration from TOML text
///
/// Same pipeline as [`load_config`] minus the file read.
///
/// # Errors
///
/// Returns a configuration error on substitution, parse, override or
/// validation failure.
pub fn load_config_str(contents: &str) -> Result<TidemarkConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: TidemarkConfig = toml::from_str(&contents)
        .map_err(|e| TidemarkError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        TidemarkError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

fn placeholder() -> Result<&'static Regex> {
    static PLACEHOLDER: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}"))
        .as_ref()
        .map_err(|e| TidemarkError::Configuration(format!("Placeholder pattern: {e}")))
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder()?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            })
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TidemarkError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env(section: &str, key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{section}_{key}")).ok()
}

fn env_parsed<T: FromStr>(section: &str, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            TidemarkError::Configuration(format!(
                "Invalid value '{raw}' for {ENV_PREFIX}_{section}_{key}: {e}"
            ))
        }),
    }
}

/// Applies environment variable overrides using the TIDEMARK_* prefix
///
/// Environment variables follow the pattern: TIDEMARK_<SECTION>_<KEY>
/// For example: TIDEMARK_SOURCE_TABLE, TIDEMARK_CAPTURE_SEED_UPDATE_TS
///
/// # Errors
///
/// Returns an error if a numeric or boolean override cannot be parsed
fn apply_env_overrides(config: &mut TidemarkConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("APPLICATION", "LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Source overrides
    let source = &mut config.source;
    if let Some(val) = env("SOURCE", "CONNECTION_STRING") {
        source.connection_string = secret_string(val);
    }
    if let Some(val) = env("SOURCE", "USERNAME") {
        source.username = Some(val);
    }
    if let Some(val) = env("SOURCE", "PASSWORD") {
        source.password = Some(secret_string(val));
    }
    if let Some(val) = env("SOURCE", "TABLE") {
        source.table = val;
    }
    if let Some(val) = env("SOURCE", "UPDATE_COLUMN") {
        source.update_column = val;
    }
    if let Some(val) = env("SOURCE", "PARTITION_COLUMN") {
        source.partition_column = val;
    }
    if let Some(val) = env("SOURCE", "SELECT_COLUMNS") {
        source.select_columns = val.split(',').map(|c| c.trim().to_string()).collect();
    }
    if let Some(val) = env_parsed("SOURCE", "MAX_CONNECTIONS")? {
        source.max_connections = val;
    }
    if let Some(val) = env_parsed("SOURCE", "STATEMENT_TIMEOUT_SECONDS")? {
        source.statement_timeout_seconds = val;
    }
    if let Some(val) = env("SOURCE", "SSL_MODE") {
        source.ssl_mode = val;
    }

    // Capture overrides
    if let Some(val) = env_parsed("CAPTURE", "SEED_UPDATE_TS")? {
        config.capture.seed_update_ts = Some(val);
    }
    if let Some(val) = env_parsed("CAPTURE", "SEED_PARTITION")? {
        config.capture.seed_partition = Some(val);
    }
    if let Some(val) = env_parsed("CAPTURE", "END_UPDATE_TS")? {
        config.capture.end_update_ts = Some(val);
    }
    if let Some(val) = env_parsed("CAPTURE", "END_PARTITION")? {
        config.capture.end_partition = Some(val);
    }

    // Schedule overrides
    if let Some(val) = env_parsed("SCHEDULE", "INITIAL_DELAY_SECONDS")? {
        config.schedule.initial_delay_seconds = val;
    }
    if let Some(val) = env_parsed("SCHEDULE", "POLL_INTERVAL_SECONDS")? {
        config.schedule.poll_interval_seconds = val;
    }

    // State overrides
    if let Some(val) = env("STATE", "BACKEND") {
        config.state.backend = val.parse().map_err(TidemarkError::Configuration)?;
    }
    if let Some(val) = env("STATE", "STREAM_NAME") {
        config.state.stream_name = Some(val);
    }
    if let Some(val) = env("STATE", "TABLE") {
        config.state.table = val;
    }
    if let Some(val) = env_parsed("STATE", "RESUME")? {
        config.state.resume = val;
    }

    // Sink overrides
    if let Some(val) = env("SINK", "PATH") {
        config.sink.path = Some(val);
    }

    // Logging overrides
    if let Some(val) = env_parsed("LOGGING", "LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("LOGGING", "LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
