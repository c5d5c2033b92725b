//! Metric storage and exposition for simulated instances.
//!
//! Metrics are recorded through the [`metrics`][metrics] facade into an explicitly constructed [`MetricRegistry`],
//! which is then rendered in the Prometheus text exposition format when scraped.
//!
//! [metrics]: https://docs.rs/metrics
#![deny(warnings)]
#![deny(missing_docs)]

mod builder;
pub use self::builder::SeriesBuilder;

mod exposition;
pub use self::exposition::PROMETHEUS_TEXT_CONTENT_TYPE;

mod registry;
pub use self::registry::{MetricRegistry, SeriesKind};
