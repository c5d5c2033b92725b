//! Static metric tables for every instance variant.

use std::{borrow::Cow, fmt, num::NonZeroUsize};

use crate::{error::UnknownInstanceType, policy::ValueRange, InstanceError};

/// Label names attached to every metric, in exposition order.
pub const LABEL_NAMES: [&str; 3] = ["instance_id", "tenant_id", "region"];

/// Default number of series generated by a stress test instance.
pub const DEFAULT_TIME_SERIES_COUNT: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(count) => count,
    None => unreachable!(),
};

/// Kind of a simulated metric.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricKind {
    /// Replaced with a fresh sample on every tick.
    Gauge,

    /// Increased by a fresh sample on every tick.
    Counter,
}

/// Static description of a single simulated metric.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetricDefinition {
    name: Cow<'static, str>,
    series_name: Cow<'static, str>,
    kind: MetricKind,
    description: Cow<'static, str>,
}

impl MetricDefinition {
    /// Short metric name, used as the key for value ranges and defects (e.g. `cpu_usage`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the exposed series (e.g. `vm_cpu_usage`).
    pub fn series_name(&self) -> &str {
        &self.series_name
    }

    /// Kind of the metric.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Human-readable description, exposed as the series help text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Label names carried by every sample of the metric.
    pub fn labels(&self) -> &'static [&'static str] {
        &LABEL_NAMES
    }
}

struct MetricRow {
    name: &'static str,
    series_name: &'static str,
    kind: MetricKind,
    description: &'static str,
    baseline: ValueRange,
}

const fn gauge(
    name: &'static str, series_name: &'static str, description: &'static str, min: i64, max: i64,
) -> MetricRow {
    MetricRow {
        name,
        series_name,
        kind: MetricKind::Gauge,
        description,
        baseline: ValueRange::new(min, max),
    }
}

const fn counter(
    name: &'static str, series_name: &'static str, description: &'static str, min: i64, max: i64,
) -> MetricRow {
    MetricRow {
        name,
        series_name,
        kind: MetricKind::Counter,
        description,
        baseline: ValueRange::new(min, max),
    }
}

const VM_METRICS: &[MetricRow] = &[
    gauge("cpu_usage", "vm_cpu_usage", "CPU usage in percentage", 0, 80),
    gauge("memory_usage", "vm_memory_usage", "Memory usage in percentage", 0, 80),
    gauge("storage_usage", "vm_storage_usage", "Storage usage in percentage", 0, 80),
    gauge("network_io", "vm_network_io", "Network I/O in bytes per second", 0, 80),
    gauge("disk_io", "vm_disk_io", "Disk I/O in operations per second", 0, 80),
];

const DBAAS_METRICS: &[MetricRow] = &[
    gauge("cpu_usage", "dbaas_cpu_usage", "CPU usage in percentage", 0, 80),
    gauge("memory_usage", "dbaas_memory_usage", "Memory usage in percentage", 0, 80),
    gauge("storage_usage", "dbaas_storage_usage", "Storage usage in percentage", 20, 80),
    gauge("network_usage", "dbaas_network_usage", "Network usage in percentage", 0, 80),
    gauge("db_connections", "dbaas_db_connections", "Number of database connections", 10, 80),
    gauge(
        "query_latency",
        "dbaas_query_latency",
        "Latency of database queries in milliseconds",
        5,
        50,
    ),
    gauge("errors", "dbaas_errors", "Number of errors", 0, 0),
    gauge("up", "up", "DBaaS instance status", 1, 1),
    counter("db_queries", "dbaas_db_queries", "Number of database queries", 0, 80),
];

const K8S_METRICS: &[MetricRow] = &[
    gauge("cpu_usage", "k8saas_cpu_usage", "CPU usage in percentage", 0, 80),
    gauge("memory_usage", "k8saas_memory_usage", "Memory usage in percentage", 0, 80),
    gauge("storage_usage", "k8saas_storage_usage", "Storage usage in percentage", 0, 80),
    gauge("network_usage", "k8saas_network_usage", "Network usage in percentage", 0, 80),
    gauge("pods", "k8saas_pods", "Number of pods", 200, 200),
    gauge("pods_down", "k8saas_pods_down", "Number of pods not in ready state", 0, 0),
    gauge("services", "k8saas_services", "Number of services in the cluster", 40, 40),
    gauge("services_down", "k8saas_services_down", "Number of services down", 40, 40),
    gauge("nodes", "k8saas_nodes", "Number of nodes in the cluster", 5, 5),
    gauge("nodes_down", "k8saas_nodes_down", "Number of nodes down in the cluster", 0, 0),
    gauge("up", "up", "K8saaS instance status", 1, 1),
];

const STRESS_TEST_BASELINE: ValueRange = ValueRange::new(0, 100);

const VM_DEFECTS: &[&str] = &["cpu_usage", "memory_usage", "storage_usage", "network_io", "disk_io"];

const DBAAS_DEFECTS: &[&str] = &[
    "cpu_usage",
    "memory_usage",
    "storage_usage",
    "network_usage",
    "db_connections",
    "db_queries",
    "query_latency",
    "errors",
    "up",
];

const K8S_DEFECTS: &[&str] = &[
    "cpu_usage",
    "memory_usage",
    "storage_usage",
    "network_usage",
    "pods",
    "services",
    "nodes",
    "up",
];

/// A simulated instance variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstanceKind {
    /// Virtual machine.
    Vm,

    /// Database-as-a-service instance.
    Dbaas,

    /// Kubernetes-as-a-service cluster.
    K8sService,

    /// Generates a large number of distinct gauges to load-test the scrape pipeline.
    StressTest {
        /// Number of gauges to generate.
        time_series_count: NonZeroUsize,
    },
}

impl InstanceKind {
    /// Maps an instance type tag to its variant.
    ///
    /// Tags are matched case-insensitively against `VM`, `DBAAS`, `K8SAAS`, and `STRESS_TEST`. The given series count
    /// only applies to stress test instances.
    ///
    /// # Errors
    ///
    /// If the tag does not name a known variant, an error is returned.
    pub fn from_type_tag(tag: &str, time_series_count: NonZeroUsize) -> Result<Self, InstanceError> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "VM" => Ok(Self::Vm),
            "DBAAS" => Ok(Self::Dbaas),
            "K8SAAS" => Ok(Self::K8sService),
            "STRESS_TEST" | "STRESSTEST" => Ok(Self::StressTest { time_series_count }),
            _ => UnknownInstanceType { instance_type: tag }.fail(),
        }
    }

    /// Returns the canonical type tag of this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Vm => "VM",
            Self::Dbaas => "DBAAS",
            Self::K8sService => "K8SAAS",
            Self::StressTest { .. } => "STRESS_TEST",
        }
    }

    /// Returns the metrics that can be switched to an anomalous range for this variant.
    pub fn eligible_defects(&self) -> &'static [&'static str] {
        match self {
            Self::Vm => VM_DEFECTS,
            Self::Dbaas => DBAAS_DEFECTS,
            Self::K8sService => K8S_DEFECTS,
            Self::StressTest { .. } => &[],
        }
    }

    /// Returns the definitions of every metric declared by this variant, in declaration order.
    pub fn metric_definitions(&self) -> Vec<MetricDefinition> {
        self.baseline_table().into_iter().map(|(definition, _)| definition).collect()
    }

    /// Returns every declared metric paired with its baseline range, in declaration order.
    pub(crate) fn baseline_table(&self) -> Vec<(MetricDefinition, ValueRange)> {
        let rows = match self {
            Self::Vm => VM_METRICS,
            Self::Dbaas => DBAAS_METRICS,
            Self::K8sService => K8S_METRICS,
            Self::StressTest { time_series_count } => return stress_test_table(*time_series_count),
        };

        rows.iter()
            .map(|row| {
                let definition = MetricDefinition {
                    name: Cow::Borrowed(row.name),
                    series_name: Cow::Borrowed(row.series_name),
                    kind: row.kind,
                    description: Cow::Borrowed(row.description),
                };
                (definition, row.baseline)
            })
            .collect()
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

fn stress_test_table(time_series_count: NonZeroUsize) -> Vec<(MetricDefinition, ValueRange)> {
    (0..time_series_count.get())
        .map(|i| {
            let name = format!("stress_test_gauge_{}", i);
            let definition = MetricDefinition {
                name: Cow::Owned(name.clone()),
                series_name: Cow::Owned(name),
                kind: MetricKind::Gauge,
                description: Cow::Owned(format!("A Gauge of other many. Index: {}", i)),
            };
            (definition, STRESS_TEST_BASELINE)
        })
        .collect()
}
