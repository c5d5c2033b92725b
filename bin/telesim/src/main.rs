//! Simulates the telemetry of a single cloud instance, and exposes it for Prometheus to scrape.
//!
//! The instance is configured entirely through environment variables. Its metrics are refreshed on a fixed interval,
//! with defective metrics sampling from anomalous ranges, and served in the Prometheus text format.

#![deny(warnings)]
#![deny(missing_docs)]

use telesim_app::prelude::*;
use telesim_error::{ErrorContext as _, GenericError};
use telesim_metrics::MetricRegistry;
use tracing::{error, info};

mod config;
use self::config::SimulatorConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let configuration = EnvironmentConfiguration::from_environment();

    let logging_config = match LoggingConfiguration::from_configuration(&configuration) {
        Ok(config) => config,
        Err(e) => fatal_and_exit(format!("failed to load logging configuration: {:?}", e)),
    };
    if let Err(e) = initialize_logging(&logging_config) {
        fatal_and_exit(format!("failed to initialize logging: {}", e));
    }

    match run(&configuration).await {
        Ok(()) => info!("telesim stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

async fn run(configuration: &EnvironmentConfiguration) -> Result<(), GenericError> {
    info!("telesim starting...");

    let config = SimulatorConfig::from_configuration(configuration)?;
    let registry = MetricRegistry::new();
    let instance = config
        .instance_builder()?
        .build(&registry)
        .error_context("Failed to create simulated instance.")?;

    let identity = instance.identity();
    info!("Instance set to {}.", instance.kind());
    info!("Scrape interval set to {} seconds.", config.scrape_interval().as_secs());
    info!("Metrics server will run on port {}.", config.listen_address().port());
    info!("Instance id: {}", identity.id());
    info!("Tenant id: {}", identity.tenant_id());
    info!("Region: {}", identity.region());
    info!("Defects: {}", instance.defects());
    info!("Simulating {} metrics.", instance.metric_count());

    ExpositionServer::new(registry).serve(config.listen_address()).await?;

    instance.run(config.scrape_interval()).await;

    Ok(())
}
