//! Simulated cloud instances.
//!
//! An [`Instance`] is one of a fixed set of variants ([`InstanceKind`]), each declaring a static table of metrics with a
//! baseline value range. Instances may carry defects: metrics that sample from an anomalous range for the lifetime of
//! the instance. A [`ScrapeLoop`] refreshes every metric of an instance on a fixed interval.
#![deny(warnings)]
#![deny(missing_docs)]

mod catalog;
pub use self::catalog::{InstanceKind, MetricDefinition, MetricKind, DEFAULT_TIME_SERIES_COUNT, LABEL_NAMES};

mod defects;
pub use self::defects::DefectSet;

mod error;
pub use self::error::InstanceError;

mod identity;
pub use self::identity::InstanceIdentity;

mod instance;
pub use self::instance::{Instance, InstanceBuilder};

mod policy;
pub use self::policy::{defect_range, ValueRange, ValueRangePolicy, DEFAULT_DEFECT_RANGE};

mod scrape;
pub use self::scrape::{ScrapeLoop, Sleeper, TokioSleeper};
