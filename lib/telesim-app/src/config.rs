//! Configuration loaded from environment variables.

use figment::{
    error::Kind,
    providers::Serialized,
    value::{Dict, Value},
    Figment,
};
use serde::Deserialize;
use snafu::Snafu;
use tracing::debug;

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// One or more required environment variables were not set.
    #[snafu(display("Missing environment variables: {}.", variables.join(", ")))]
    MissingVariables {
        /// Names of the missing environment variables.
        variables: Vec<String>,
    },

    /// An environment variable was set to a value that could not be parsed.
    #[snafu(display("Invalid value for environment variable {}: {}", variable, reason))]
    InvalidValue {
        /// Name of the environment variable.
        variable: String,

        /// Why the value was rejected.
        reason: String,
    },

    /// Generic configuration error.
    #[snafu(display("Failed to load configuration: {}", source))]
    Generic {
        /// Error source.
        source: figment::Error,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        if let Kind::MissingField(field) = &e.kind {
            return Self::MissingVariables {
                variables: vec![variable_name(field)],
            };
        }

        let is_value_error = matches!(e.kind, Kind::InvalidType(..) | Kind::InvalidValue(..) | Kind::Message(..));
        if is_value_error && !e.path.is_empty() {
            return Self::InvalidValue {
                variable: variable_name(&e.path.join("_")),
                reason: e.kind.to_string(),
            };
        }

        Self::Generic { source: e }
    }
}

fn variable_name(key: &str) -> String {
    key.to_uppercase()
}

/// Configuration read from environment variables.
///
/// Variables are exposed as lowercase keys: `METRIC_PORT` is read as `metric_port`. Values are kept as strings, and
/// never reinterpreted as numbers or booleans, so identifiers like `INSTANCE_ID=0042` survive unchanged. Typed fields
/// should be deserialized with `serde_with` helpers such as `DisplayFromStr` or [`PermissiveBool`][crate::deser::PermissiveBool].
#[derive(Clone, Debug)]
pub struct EnvironmentConfiguration {
    figment: Figment,
}

impl EnvironmentConfiguration {
    /// Loads the configuration from the environment of the current process.
    ///
    /// Variables that are not valid Unicode are ignored.
    pub fn from_environment() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Loads the configuration from the given variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_lowercase(), Value::from(value.into())))
            .collect::<Dict>();
        debug!(variables = values.len(), "Loaded configuration from environment.");

        Self {
            figment: Figment::from(Serialized::defaults(values)),
        }
    }

    /// Returns `true` if the given variable is set.
    pub fn contains(&self, variable: &str) -> bool {
        self.figment.contains(&variable.to_lowercase())
    }

    /// Ensures that every given variable is set.
    ///
    /// # Errors
    ///
    /// If any variable is not set, an error naming every missing variable is returned.
    pub fn require(&self, variables: &[&str]) -> Result<(), ConfigurationError> {
        let missing = variables
            .iter()
            .filter(|variable| !self.contains(variable))
            .map(|variable| variable_name(variable))
            .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            MissingVariables { variables: missing }.fail()
        }
    }

    /// Deserializes the configuration into the given type.
    ///
    /// # Errors
    ///
    /// If a field is missing or cannot be deserialized, an error is returned.
    pub fn as_typed<'a, T>(&self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.figment.extract().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use serde_with::{serde_as, DisplayFromStr};

    use super::*;

    #[serde_as]
    #[derive(Deserialize)]
    struct Settings {
        name: String,

        #[serde_as(as = "DisplayFromStr")]
        port: u16,
    }

    #[test]
    fn values_stay_strings() {
        let config = EnvironmentConfiguration::from_vars([("NAME", "0042"), ("PORT", "8000")]);
        let settings = config.as_typed::<Settings>().unwrap();

        assert_eq!(settings.name, "0042");
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn require_reports_every_missing_variable() {
        let config = EnvironmentConfiguration::from_vars([("TENANT_ID", "t-1")]);
        let error = config
            .require(&["INSTANCE_ID", "TENANT_ID", "INSTANCE_REGION"])
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Missing environment variables: INSTANCE_ID, INSTANCE_REGION."
        );
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let config = EnvironmentConfiguration::from_vars([("NAME", "a"), ("PORT", "eighty")]);
        match config.as_typed::<Settings>() {
            Err(ConfigurationError::InvalidValue { variable, .. }) => assert_eq!(variable, "PORT"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn missing_field() {
        let config = EnvironmentConfiguration::from_vars([("PORT", "80")]);
        assert!(matches!(
            config.as_typed::<Settings>(),
            Err(ConfigurationError::MissingVariables { ref variables }) if variables == &["NAME"]
        ));
    }
}
