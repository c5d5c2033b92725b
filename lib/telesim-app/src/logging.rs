//! Logging.

use serde::Deserialize;
use serde_with::serde_as;
use telesim_error::{generic_error, ErrorContext as _, GenericError};
use tracing_subscriber::{
    filter::LevelFilter, fmt::Layer, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
    Layer as _,
};

use crate::{config::EnvironmentConfiguration, deser::PermissiveBool};

fn default_log_level() -> LogLevel {
    LevelFilter::INFO.into()
}

const fn default_false() -> bool {
    false
}

/// Logging configuration.
///
/// Read from `LOG_LEVEL`, which accepts any `EnvFilter` directive and defaults to `info`, and `LOG_FORMAT_JSON`, which
/// switches the output to flattened JSON lines.
#[serde_as]
#[derive(Deserialize)]
pub struct LoggingConfiguration {
    #[serde(default = "default_log_level")]
    log_level: LogLevel,

    #[serde_as(as = "PermissiveBool")]
    #[serde(default = "default_false")]
    log_format_json: bool,
}

impl LoggingConfiguration {
    /// Creates a new `LoggingConfiguration` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration cannot be deserialized as `LoggingConfiguration`, an error is returned.
    pub fn from_configuration(config: &EnvironmentConfiguration) -> Result<Self, GenericError> {
        config
            .as_typed()
            .error_context("Failed to load logging configuration.")
    }

    /// Returns `true` if log lines are formatted as JSON.
    pub fn log_format_json(&self) -> bool {
        self.log_format_json
    }
}

#[derive(Deserialize)]
#[serde(try_from = "String")]
struct LogLevel(EnvFilter);

impl LogLevel {
    fn as_env_filter(&self) -> EnvFilter {
        self.0.clone()
    }
}

impl From<LevelFilter> for LogLevel {
    fn from(level: LevelFilter) -> Self {
        Self(EnvFilter::default().add_directive(level.into()))
    }
}

impl TryFrom<String> for LogLevel {
    type Error = GenericError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(generic_error!("Log level cannot be empty."));
        }

        EnvFilter::builder()
            .parse(value.trim().to_lowercase())
            .map(Self)
            .error_context("Failed to parse valid log level.")
    }
}

/// Logs a message to standard error and exits the process with a non-zero exit code.
pub fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

/// Initializes the logging subsystem for `tracing`.
///
/// Events are written to standard output, either in a compact human-readable format or, when configured, as JSON.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(config: &LoggingConfiguration) -> Result<(), GenericError> {
    let formatting_layer = if config.log_format_json {
        Layer::new()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        Layer::new().compact().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(formatting_layer.with_filter(config.log_level.as_env_filter()))
        .try_init()?;

    Ok(())
}
