use std::{
    collections::HashMap,
    sync::{atomic::Ordering::Relaxed, Arc, Mutex, MutexGuard, PoisonError},
};

use indexmap::IndexMap;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Label, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use tracing::debug;

/// Kind of a registered metric family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeriesKind {
    /// Monotonically increasing total.
    Counter,

    /// Arbitrary value, replaced on every update.
    Gauge,
}

impl SeriesKind {
    /// Returns the Prometheus type name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

/// Point-in-time value of a single series.
pub(crate) enum SampleValue {
    Counter(u64),
    Gauge(f64),
}

/// Point-in-time view of every series sharing a metric name.
pub(crate) struct FamilySnapshot {
    pub(crate) name: String,
    pub(crate) kind: SeriesKind,
    pub(crate) description: Option<SharedString>,
    pub(crate) series: Vec<(Key, SampleValue)>,
}

#[derive(Default)]
struct Families {
    kinds: IndexMap<String, SeriesKind>,
    descriptions: HashMap<String, SharedString>,
}

struct Inner {
    registry: Registry<Key, AtomicStorage>,
    families: Mutex<Families>,
}

/// An explicitly constructed metric registry.
///
/// `MetricRegistry` implements [`Recorder`] on top of an atomic-backed [`Registry`], so handles returned from
/// registration update their series without taking a lock, and a concurrent reader only ever observes a complete,
/// possibly stale, value. Alongside the storage, it tracks the kind of each metric family in registration order and
/// any registered descriptions.
///
/// The registry is never installed as the global recorder. Callers register metrics against it directly, or scope it
/// with [`metrics::with_local_recorder`], which keeps independent registries (one per simulated instance in tests,
/// for example) fully isolated from each other. Cloning the registry is cheap and yields a handle to the same state.
///
/// Only counters and gauges are supported: histogram registrations return a no-op handle.
#[derive(Clone)]
pub struct MetricRegistry {
    inner: Arc<Inner>,
}

impl MetricRegistry {
    /// Creates an empty `MetricRegistry`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Registry::new(AtomicStorage {}),
                families: Mutex::new(Families::default()),
            }),
        }
    }

    fn families(&self) -> MutexGuard<'_, Families> {
        self.inner.families.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current value of the counter with the given key, or `None` if no such counter exists.
    pub fn counter<K>(&self, key: K) -> Option<u64>
    where
        K: Into<Key>,
    {
        let key = key.into();
        self.inner
            .registry
            .get_counter_handles()
            .get(&key)
            .map(|counter| counter.load(Relaxed))
    }

    /// Returns the current value of the gauge with the given key, or `None` if no such gauge exists.
    pub fn gauge<K>(&self, key: K) -> Option<f64>
    where
        K: Into<Key>,
    {
        let key = key.into();
        self.inner
            .registry
            .get_gauge_handles()
            .get(&key)
            .map(|gauge| f64::from_bits(gauge.load(Relaxed)))
    }

    /// Returns the kind of the metric family with the given name, if one is registered.
    pub fn kind_of(&self, metric_name: &str) -> Option<SeriesKind> {
        self.families().kinds.get(metric_name).copied()
    }

    /// Returns the description registered for the given metric name, if any.
    pub fn description(&self, metric_name: &str) -> Option<String> {
        self.families()
            .descriptions
            .get(metric_name)
            .map(|description| description.to_string())
    }

    /// Returns the total number of registered series across all metric names.
    pub fn series_len(&self) -> usize {
        self.inner.registry.get_counter_handles().len() + self.inner.registry.get_gauge_handles().len()
    }

    /// Returns the names of all registered metric families, in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.families().kinds.keys().cloned().collect()
    }

    /// Takes a snapshot of every metric family, in registration order.
    ///
    /// Series within a family are ordered by their labels.
    pub(crate) fn snapshot(&self) -> Vec<FamilySnapshot> {
        let mut series_by_name: HashMap<String, Vec<(Key, SampleValue)>> = HashMap::new();
        self.inner.registry.visit_counters(|key, counter| {
            series_by_name
                .entry(key.name().to_string())
                .or_default()
                .push((key.clone(), SampleValue::Counter(counter.load(Relaxed))));
        });
        self.inner.registry.visit_gauges(|key, gauge| {
            series_by_name
                .entry(key.name().to_string())
                .or_default()
                .push((key.clone(), SampleValue::Gauge(f64::from_bits(gauge.load(Relaxed)))));
        });

        let families = self.families();
        families
            .kinds
            .iter()
            .map(|(name, kind)| {
                let mut series = series_by_name.remove(name).unwrap_or_default();
                series.sort_by(|(a, _), (b, _)| a.labels().map(label_parts).cmp(b.labels().map(label_parts)));

                FamilySnapshot {
                    name: name.clone(),
                    kind: *kind,
                    description: families.descriptions.get(name).cloned(),
                    series,
                }
            })
            .collect()
    }

    fn describe(&self, key: KeyName, description: SharedString) {
        self.families()
            .descriptions
            .insert(key.as_str().to_string(), description);
    }

    /// Records the kind of the family for the given key, returning `false` if it is already registered as another kind.
    fn claim_family(&self, key: &Key, kind: SeriesKind) -> bool {
        let mut families = self.families();
        let existing = *families.kinds.entry(key.name().to_string()).or_insert(kind);
        if existing != kind {
            debug!(
                metric_name = key.name(),
                existing = existing.as_str(),
                requested = kind.as_str(),
                "Metric already registered as another kind. Ignoring registration."
            );
            return false;
        }

        true
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn label_parts(label: &Label) -> (&str, &str) {
    (label.key(), label.value())
}

impl Recorder for MetricRegistry {
    fn describe_counter(&self, key: KeyName, _: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn describe_gauge(&self, key: KeyName, _: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        if !self.claim_family(key, SeriesKind::Counter) {
            return Counter::noop();
        }

        self.inner.registry.get_or_create_counter(key, |c| c.clone().into())
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        if !self.claim_family(key, SeriesKind::Gauge) {
            return Gauge::noop();
        }

        self.inner.registry.get_or_create_gauge(key, |g| g.clone().into())
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        debug!(metric_name = key.name(), "Histograms are not supported. Ignoring registration.");
        Histogram::noop()
    }
}
