//! Value ranges, and how defects change them.

use std::{borrow::Cow, fmt};

use indexmap::IndexMap;
use rand::Rng;

use crate::{
    catalog::{InstanceKind, MetricKind},
    defects::DefectSet,
    error::InvalidRange,
    InstanceError,
};

/// Range used by defective metrics without a variant-specific anomalous range.
pub const DEFAULT_DEFECT_RANGE: ValueRange = ValueRange::new(90, 100);

const DBAAS_DEFECT_RANGES: &[(&str, ValueRange)] = &[
    ("up", ValueRange::new(0, 1)),
    ("errors", ValueRange::new(1, 5)),
    ("db_connections", ValueRange::fixed(500)),
    ("db_queries", ValueRange::fixed(0)),
    ("query_latency", ValueRange::new(60, 6000)),
];

const K8S_DEFECT_RANGES: &[(&str, ValueRange)] = &[
    ("up", ValueRange::new(0, 1)),
    ("pods", ValueRange::new(50, 200)),
    ("services", ValueRange::new(10, 40)),
    ("nodes", ValueRange::new(2, 5)),
];

/// An inclusive range of integer values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ValueRange {
    min: i64,
    max: i64,
}

impl ValueRange {
    /// Creates a new `ValueRange` covering `min` through `max`, inclusive.
    ///
    /// The bounds are not checked here: ranges are validated when a [`ValueRangePolicy`] is resolved.
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Creates a `ValueRange` that only contains `value`.
    pub const fn fixed(value: i64) -> Self {
        Self::new(value, value)
    }

    /// Lower bound, inclusive.
    pub const fn min(&self) -> i64 {
        self.min
    }

    /// Upper bound, inclusive.
    pub const fn max(&self) -> i64 {
        self.max
    }

    /// Returns `true` if `value` lies within the range.
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Draws a uniformly distributed value from the range.
    ///
    /// The range must not be inverted, which holds for every range handed out by a resolved [`ValueRangePolicy`].
    pub fn sample<R>(&self, rng: &mut R) -> i64
    where
        R: Rng + ?Sized,
    {
        rng.random_range(self.min..=self.max)
    }

    fn validate(&self, metric: &str, kind: MetricKind) -> Result<(), InstanceError> {
        if self.min > self.max {
            return InvalidRange {
                metric,
                min: self.min,
                max: self.max,
                reason: "lower bound exceeds upper bound",
            }
            .fail();
        }

        if kind == MetricKind::Counter && self.min < 0 {
            return InvalidRange {
                metric,
                min: self.min,
                max: self.max,
                reason: "counters cannot be decremented",
            }
            .fail();
        }

        Ok(())
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Returns the anomalous range a metric samples from while it is defective.
///
/// Most metrics simply saturate into [`DEFAULT_DEFECT_RANGE`]. Some have a different failure shape: `up` flaps,
/// connection counts hit exhaustion, latency grows a long tail, and cluster capacity shrinks.
pub fn defect_range(kind: &InstanceKind, metric: &str) -> ValueRange {
    let overrides = match kind {
        InstanceKind::Dbaas => DBAAS_DEFECT_RANGES,
        InstanceKind::K8sService => K8S_DEFECT_RANGES,
        InstanceKind::Vm | InstanceKind::StressTest { .. } => &[],
    };

    overrides
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, range)| *range)
        .unwrap_or(DEFAULT_DEFECT_RANGE)
}

/// The effective value range of every metric of an instance.
///
/// Resolved once at construction from the variant's baseline table and the instance's defects, and never changed
/// afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueRangePolicy {
    ranges: IndexMap<Cow<'static, str>, ValueRange>,
}

impl ValueRangePolicy {
    /// Resolves the per-metric ranges for the given variant and defects.
    ///
    /// Metrics in `defects` sample from their [`defect_range`], and every other metric keeps its baseline range.
    ///
    /// # Errors
    ///
    /// If any resolved range is inverted, or a counter range includes negative values, an error is returned.
    pub fn resolve(kind: &InstanceKind, defects: &DefectSet) -> Result<Self, InstanceError> {
        let table = kind.baseline_table();
        let mut ranges = IndexMap::with_capacity(table.len());

        for (definition, baseline) in table {
            let range = if defects.contains(definition.name()) {
                defect_range(kind, definition.name())
            } else {
                baseline
            };
            range.validate(definition.name(), definition.kind())?;

            ranges.insert(Cow::Owned(definition.name().to_string()), range);
        }

        Ok(Self { ranges })
    }

    /// Returns the range of the given metric, if it is declared.
    pub fn range(&self, metric: &str) -> Option<ValueRange> {
        self.ranges.get(metric).copied()
    }

    /// Returns an iterator over every metric name and its range, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueRange)> {
        self.ranges.iter().map(|(name, range)| (name.as_ref(), *range))
    }

    /// Returns the number of metrics covered by the policy.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Returns `true` if the policy covers no metrics.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
