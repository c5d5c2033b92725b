use std::time::Duration;

use metrics::{Counter, Gauge};
use rand::{rngs::StdRng, SeedableRng as _};
use telesim_metrics::{MetricRegistry, SeriesBuilder};
use tracing::debug;

use crate::{
    catalog::{InstanceKind, MetricDefinition, MetricKind},
    defects::DefectSet,
    identity::InstanceIdentity,
    policy::{ValueRange, ValueRangePolicy},
    scrape::ScrapeLoop,
    InstanceError,
};

enum MetricHandle {
    Gauge(Gauge),
    Counter(Counter),
}

impl MetricHandle {
    fn apply(&self, value: i64) {
        match self {
            Self::Gauge(gauge) => gauge.set(value as f64),
            // Counter ranges are validated to be non-negative when the policy is resolved.
            Self::Counter(counter) => counter.increment(u64::try_from(value).unwrap_or_default()),
        }
    }
}

struct ActiveMetric {
    range: ValueRange,
    handle: MetricHandle,
}

/// Builder for a simulated [`Instance`].
///
/// Explicit defects take precedence over random defect selection. Without either, the instance is healthy.
pub struct InstanceBuilder {
    identity: InstanceIdentity,
    kind: InstanceKind,
    explicit_defects: Vec<String>,
    has_random_defects: bool,
    seed: Option<u64>,
}

impl InstanceBuilder {
    /// Creates a new `InstanceBuilder` for a healthy instance.
    pub fn new(identity: InstanceIdentity, kind: InstanceKind) -> Self {
        Self {
            identity,
            kind,
            explicit_defects: Vec::new(),
            has_random_defects: false,
            seed: None,
        }
    }

    /// Sets the metrics that are defective.
    ///
    /// When non-empty, random defect selection is disabled.
    pub fn with_defects<I, S>(mut self, defects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_defects = defects.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether a random subset of the eligible defects is drawn at build time.
    pub fn with_random_defects(mut self, has_random_defects: bool) -> Self {
        self.has_random_defects = has_random_defects;
        self
    }

    /// Seeds the random number generator of the instance.
    ///
    /// Seeded instances select the same defects and emit the same sequence of values on every run.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Builds the instance, registering every declared metric into the given registry.
    ///
    /// # Errors
    ///
    /// If an explicit defect is not eligible for the instance type, or a resolved value range is invalid, an error is
    /// returned. No metrics are registered in that case.
    pub fn build(self, registry: &MetricRegistry) -> Result<Instance, InstanceError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let defects = if !self.explicit_defects.is_empty() {
            DefectSet::explicit(&self.kind, &self.explicit_defects)?
        } else if self.has_random_defects {
            DefectSet::random(&self.kind, &mut rng)
        } else {
            DefectSet::none()
        };
        let policy = ValueRangePolicy::resolve(&self.kind, &defects)?;

        let builder = SeriesBuilder::new(registry)
            .add_default_label("instance_id", self.identity.id().to_string())
            .add_default_label("tenant_id", self.identity.tenant_id().to_string())
            .add_default_label("region", self.identity.region().to_string());

        let (definitions, metrics): (Vec<_>, Vec<_>) = self
            .kind
            .baseline_table()
            .into_iter()
            .map(|(definition, baseline)| {
                let range = policy.range(definition.name()).unwrap_or(baseline);
                let handle = match definition.kind() {
                    MetricKind::Gauge => {
                        MetricHandle::Gauge(builder.register_gauge(definition.series_name(), definition.description()))
                    }
                    MetricKind::Counter => MetricHandle::Counter(
                        builder.register_counter(definition.series_name(), definition.description()),
                    ),
                };

                (definition, ActiveMetric { range, handle })
            })
            .unzip();

        debug!(
            instance_id = self.identity.id(),
            instance_type = self.kind.type_tag(),
            metrics = metrics.len(),
            defects = %defects,
            "Registered instance metrics."
        );

        Ok(Instance {
            identity: self.identity,
            kind: self.kind,
            defects,
            policy,
            definitions,
            metrics,
            rng,
        })
    }
}

/// A simulated cloud instance.
///
/// Holds handles to every registered metric, and refreshes all of them with a fresh sample on each tick.
pub struct Instance {
    identity: InstanceIdentity,
    kind: InstanceKind,
    defects: DefectSet,
    policy: ValueRangePolicy,
    definitions: Vec<MetricDefinition>,
    metrics: Vec<ActiveMetric>,
    rng: StdRng,
}

impl Instance {
    /// Samples a new value for every metric.
    ///
    /// Gauges are set to the sampled value, while counters are incremented by it.
    pub fn tick(&mut self) {
        for metric in &self.metrics {
            metric.handle.apply(metric.range.sample(&mut self.rng));
        }
    }

    /// Returns the definitions of every registered metric, in declaration order.
    pub fn describe_metrics(&self) -> &[MetricDefinition] {
        &self.definitions
    }

    /// Returns the number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    /// Returns the defective metrics of the instance.
    pub fn defects(&self) -> &DefectSet {
        &self.defects
    }

    /// Returns the value range of every metric of the instance.
    pub fn policy(&self) -> &ValueRangePolicy {
        &self.policy
    }

    /// Returns the identity of the instance.
    pub fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    /// Returns the variant of the instance.
    pub fn kind(&self) -> &InstanceKind {
        &self.kind
    }

    /// Ticks the instance forever, waiting `interval` between ticks.
    ///
    /// This never returns.
    pub async fn run(self, interval: Duration) {
        ScrapeLoop::new(self, interval).run().await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, num::NonZeroUsize};

    use proptest::prelude::*;

    use super::*;

    fn identity() -> InstanceIdentity {
        InstanceIdentity::new("i-1", "t-1", "us-east")
    }

    fn build(kind: InstanceKind, registry: &MetricRegistry) -> Instance {
        InstanceBuilder::new(identity(), kind)
            .with_seed(Some(7))
            .build(registry)
            .unwrap()
    }

    #[test]
    fn healthy_vm_stays_in_baseline() {
        let registry = MetricRegistry::new();
        let mut instance = build(InstanceKind::Vm, &registry);
        let key = identity().series_key("vm_cpu_usage");

        for _ in 0..1_000 {
            instance.tick();
            let value = registry.gauge(key.clone()).unwrap();
            assert!((0.0..=80.0).contains(&value), "cpu_usage out of range: {}", value);
        }
    }

    #[test]
    fn metrics_are_registered_before_the_first_tick() {
        let registry = MetricRegistry::new();
        let instance = build(InstanceKind::K8sService, &registry);

        assert_eq!(instance.metric_count(), 11);
        assert_eq!(registry.series_len(), 11);
        assert_eq!(registry.metric_names().first().map(String::as_str), Some("k8saas_cpu_usage"));
        assert_eq!(registry.gauge(identity().series_key("k8saas_pods")), Some(0.0));
        assert_eq!(
            registry.description("k8saas_nodes_down").as_deref(),
            Some("Number of nodes down in the cluster")
        );
    }

    #[test]
    fn healthy_k8s_reports_steady_capacity() {
        let registry = MetricRegistry::new();
        let mut instance = build(InstanceKind::K8sService, &registry);
        instance.tick();

        assert_eq!(registry.gauge(identity().series_key("k8saas_services")), Some(40.0));
        assert_eq!(registry.gauge(identity().series_key("k8saas_services_down")), Some(40.0));
        assert_eq!(registry.gauge(identity().series_key("k8saas_pods_down")), Some(0.0));
    }

    #[test]
    fn dbaas_exposition() {
        let registry = MetricRegistry::new();
        let mut instance = build(InstanceKind::Dbaas, &registry);
        instance.tick();

        let payload = registry.render();
        assert!(payload.contains("# HELP dbaas_db_queries_total Number of database queries\n"));
        assert!(payload.contains("# TYPE dbaas_db_queries_total counter\n"));
        assert!(payload.contains("# TYPE up gauge\n"));
        assert!(payload.contains("up{instance_id=\"i-1\",tenant_id=\"t-1\",region=\"us-east\"} 1\n"));
        assert!(payload.contains("dbaas_errors{instance_id=\"i-1\",tenant_id=\"t-1\",region=\"us-east\"} 0\n"));
    }

    #[test]
    fn stress_test_registers_distinct_gauges() {
        let registry = MetricRegistry::new();
        let kind = InstanceKind::StressTest {
            time_series_count: NonZeroUsize::new(50).unwrap(),
        };
        let mut instance = build(kind, &registry);
        instance.tick();

        assert_eq!(registry.series_len(), 50);
        for definition in instance.describe_metrics() {
            let value = registry.gauge(identity().series_key(definition.series_name())).unwrap();
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn explicit_defects_take_precedence() {
        let registry = MetricRegistry::new();
        let instance = InstanceBuilder::new(identity(), InstanceKind::Dbaas)
            .with_defects(["up"])
            .with_random_defects(true)
            .build(&registry)
            .unwrap();

        assert_eq!(instance.defects().iter().collect::<Vec<_>>(), vec!["up"]);
        assert_eq!(instance.policy().range("up"), Some(ValueRange::new(0, 1)));
        assert_eq!(instance.policy().range("cpu_usage"), Some(ValueRange::new(0, 80)));
    }

    #[test]
    fn unknown_defect_registers_nothing() {
        let registry = MetricRegistry::new();
        let result = InstanceBuilder::new(identity(), InstanceKind::Vm)
            .with_defects(["pods"])
            .build(&registry);

        assert!(matches!(result, Err(InstanceError::UnknownDefect { .. })));
        assert_eq!(registry.series_len(), 0);
    }

    #[test]
    fn healthy_without_random_defects() {
        let registry = MetricRegistry::new();
        let instance = build(InstanceKind::Dbaas, &registry);
        assert!(instance.defects().is_empty());
    }

    #[test]
    fn defects_are_stable() {
        let registry = MetricRegistry::new();
        let mut instance = InstanceBuilder::new(identity(), InstanceKind::K8sService)
            .with_random_defects(true)
            .build(&registry)
            .unwrap();

        let first = instance.defects().clone();
        for _ in 0..10 {
            instance.tick();
        }
        assert_eq!(instance.defects(), &first);
        assert!(!first.is_empty());
    }

    #[test]
    fn seeded_instances_are_reproducible() {
        let samples = |seed| {
            let registry = MetricRegistry::new();
            let mut instance = InstanceBuilder::new(identity(), InstanceKind::Vm)
                .with_random_defects(true)
                .with_seed(Some(seed))
                .build(&registry)
                .unwrap();
            instance.tick();

            let values = instance
                .describe_metrics()
                .iter()
                .map(|definition| registry.gauge(identity().series_key(definition.series_name())))
                .collect::<Vec<_>>();
            (instance.defects().clone(), values)
        };

        assert_eq!(samples(1234), samples(1234));
    }

    #[test]
    fn every_series_carries_the_label_tuple() {
        let registry = MetricRegistry::new();
        let instance = build(InstanceKind::Dbaas, &registry);

        let series_names = instance
            .describe_metrics()
            .iter()
            .map(|definition| definition.series_name().to_string())
            .collect::<HashSet<_>>();
        for name in series_names {
            let key = identity().series_key(&name);
            let present = registry.gauge(key.clone()).is_some() || registry.counter(key).is_some();
            assert!(present, "{} is missing the label tuple", name);
        }
    }

    proptest! {
        #[test]
        fn property_test_dbaas_queries_never_decrease(seed: u64, ticks in 1usize..64) {
            let registry = MetricRegistry::new();
            let mut instance = InstanceBuilder::new(identity(), InstanceKind::Dbaas)
                .with_random_defects(true)
                .with_seed(Some(seed))
                .build(&registry)
                .unwrap();
            let key = identity().series_key("dbaas_db_queries");

            let mut previous = 0;
            for _ in 0..ticks {
                instance.tick();
                let current = registry.counter(key.clone()).unwrap();
                prop_assert!(current >= previous);
                previous = current;
            }
        }

        #[test]
        fn property_test_samples_stay_within_policy(seed: u64, kind_idx in 0usize..3) {
            let kind = [InstanceKind::Vm, InstanceKind::Dbaas, InstanceKind::K8sService][kind_idx];
            let registry = MetricRegistry::new();
            let mut instance = InstanceBuilder::new(identity(), kind)
                .with_random_defects(true)
                .with_seed(Some(seed))
                .build(&registry)
                .unwrap();

            for _ in 0..16 {
                instance.tick();
                for definition in instance.describe_metrics() {
                    if definition.kind() != MetricKind::Gauge {
                        continue;
                    }

                    let range = instance.policy().range(definition.name()).unwrap();
                    let value = registry.gauge(identity().series_key(definition.series_name())).unwrap();
                    prop_assert!(range.contains(value as i64));
                }
            }
        }
    }
}
