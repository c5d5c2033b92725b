use std::{
    net::{Ipv4Addr, SocketAddr},
    num::{NonZeroU64, NonZeroUsize},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use telesim_app::{
    config::EnvironmentConfiguration,
    deser::{CommaSeparated, PermissiveBool},
};
use telesim_core::{InstanceBuilder, InstanceError, InstanceIdentity, InstanceKind, DEFAULT_TIME_SERIES_COUNT};
use telesim_error::{ErrorContext as _, GenericError};

/// Variables that must be set for the simulator to start.
const REQUIRED_VARIABLES: &[&str] = &["INSTANCE_ID", "TENANT_ID", "INSTANCE_REGION", "INSTANCE_TYPE"];

const fn default_scrape_interval() -> NonZeroU64 {
    match NonZeroU64::new(60) {
        Some(interval) => interval,
        None => unreachable!(),
    }
}

const fn default_metric_port() -> u16 {
    8000
}

const fn default_time_series_count() -> NonZeroUsize {
    DEFAULT_TIME_SERIES_COUNT
}

/// Simulator configuration.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct SimulatorConfig {
    /// Identifier of the simulated instance.
    instance_id: String,

    /// Identifier of the tenant owning the simulated instance.
    tenant_id: String,

    /// Region the simulated instance is deployed in.
    instance_region: String,

    /// Instance type tag: `VM`, `DBAAS`, `K8SAAS`, or `STRESS_TEST`.
    instance_type: String,

    /// Seconds between metric refreshes.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_scrape_interval")]
    scrape_interval: NonZeroU64,

    /// Port the metrics endpoint listens on.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_metric_port")]
    metric_port: u16,

    /// Whether a random subset of the eligible defects is selected.
    #[serde_as(as = "PermissiveBool")]
    #[serde(default)]
    has_defect: bool,

    /// Explicitly selected defects, which take precedence over `has_defect`.
    #[serde_as(as = "CommaSeparated")]
    #[serde(default)]
    instance_defects: Vec<String>,

    /// Number of series generated by stress test instances.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_time_series_count")]
    time_series_count: NonZeroUsize,

    /// Seed for the instance's random number generator.
    #[serde_as(as = "Option<DisplayFromStr>")]
    random_seed: Option<u64>,
}

impl SimulatorConfig {
    /// Creates a new `SimulatorConfig` from the given configuration.
    ///
    /// # Errors
    ///
    /// If any required variable is missing, an error naming every missing variable is returned. If any variable is set
    /// to an invalid value, an error is returned.
    pub fn from_configuration(config: &EnvironmentConfiguration) -> Result<Self, GenericError> {
        config.require(REQUIRED_VARIABLES)?;
        config
            .as_typed()
            .error_context("Failed to load simulator configuration.")
    }

    /// Returns the instance variant named by the configured instance type.
    ///
    /// # Errors
    ///
    /// If the instance type is not known, an error is returned.
    pub fn instance_kind(&self) -> Result<InstanceKind, InstanceError> {
        InstanceKind::from_type_tag(&self.instance_type, self.time_series_count)
    }

    /// Returns an instance builder for the configured identity, defects, and seed.
    ///
    /// # Errors
    ///
    /// If the instance type is not known, an error is returned.
    pub fn instance_builder(&self) -> Result<InstanceBuilder, InstanceError> {
        let identity = InstanceIdentity::new(&self.instance_id, &self.tenant_id, &self.instance_region);
        let builder = InstanceBuilder::new(identity, self.instance_kind()?)
            .with_defects(self.instance_defects.iter().cloned())
            .with_random_defects(self.has_defect)
            .with_seed(self.random_seed);

        Ok(builder)
    }

    /// Returns the interval between metric refreshes.
    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval.get())
    }

    /// Returns the address the metrics endpoint listens on.
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metric_port))
    }
}
