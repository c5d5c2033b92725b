//! Defect selection for simulated instances.

use std::fmt;

use rand::{seq::IndexedRandom as _, Rng};

use crate::{catalog::InstanceKind, error::UnknownDefect, InstanceError};

/// The set of metrics of an instance that sample from an anomalous range.
///
/// Always a subset of the variant's eligible defects, and fixed for the lifetime of the instance.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DefectSet {
    metrics: Vec<&'static str>,
}

impl DefectSet {
    /// Creates an empty `DefectSet`.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a `DefectSet` from explicitly requested metric names.
    ///
    /// Duplicate names are ignored. Names are kept in the order they were first requested.
    ///
    /// # Errors
    ///
    /// If any name is not an eligible defect for the given variant, an error is returned.
    pub fn explicit<I, S>(kind: &InstanceKind, defects: I) -> Result<Self, InstanceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let eligible = kind.eligible_defects();
        let mut metrics = Vec::new();

        for defect in defects {
            let defect = defect.as_ref();
            let metric = match eligible.iter().find(|eligible| **eligible == defect) {
                Some(metric) => *metric,
                None => {
                    return UnknownDefect {
                        defect,
                        instance_type: kind.type_tag(),
                        eligible,
                    }
                    .fail()
                }
            };

            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }

        Ok(Self { metrics })
    }

    /// Draws a random, non-empty subset of the variant's eligible defects.
    ///
    /// The subset size is uniformly distributed between one and the number of eligible defects, and the members are
    /// then chosen uniformly. Variants without eligible defects yield an empty set. Members are kept in declaration
    /// order.
    pub fn random<R>(kind: &InstanceKind, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let eligible = kind.eligible_defects();
        if eligible.is_empty() {
            return Self::none();
        }

        let amount = rng.random_range(1..=eligible.len());
        let chosen = eligible.choose_multiple(rng, amount).copied().collect::<Vec<_>>();
        let metrics = eligible
            .iter()
            .copied()
            .filter(|metric| chosen.contains(metric))
            .collect();

        Self { metrics }
    }

    /// Returns `true` if the given metric is defective.
    pub fn contains(&self, metric: &str) -> bool {
        self.metrics.iter().any(|defect| *defect == metric)
    }

    /// Returns an iterator over the defective metric names.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.metrics.iter().copied()
    }

    /// Returns the number of defective metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if no metric is defective.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl fmt::Display for DefectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.metrics.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&self.metrics.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng as _};

    use super::*;

    const KINDS: [InstanceKind; 3] = [InstanceKind::Vm, InstanceKind::Dbaas, InstanceKind::K8sService];

    #[test]
    fn explicit_defects_must_be_eligible() {
        let error = DefectSet::explicit(&InstanceKind::Vm, ["cpu_usage", "db_connections"]).unwrap_err();
        match error {
            InstanceError::UnknownDefect {
                defect, instance_type, ..
            } => {
                assert_eq!(defect, "db_connections");
                assert_eq!(instance_type, "VM");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn explicit_defects_deduplicate() {
        let defects = DefectSet::explicit(&InstanceKind::Dbaas, ["up", "errors", "up"]).unwrap();
        assert_eq!(defects.iter().collect::<Vec<_>>(), vec!["up", "errors"]);
        assert!(defects.contains("errors"));
        assert!(!defects.contains("cpu_usage"));
    }

    #[test]
    fn no_eligible_defects_for_stress_test() {
        let kind = InstanceKind::StressTest {
            time_series_count: NonZeroUsize::new(10).unwrap(),
        };

        assert!(DefectSet::random(&kind, &mut StdRng::seed_from_u64(7)).is_empty());
        assert!(DefectSet::explicit(&kind, ["stress_test_gauge_0"]).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(DefectSet::none().to_string(), "none");

        let defects = DefectSet::explicit(&InstanceKind::K8sService, ["pods", "nodes"]).unwrap();
        assert_eq!(defects.to_string(), "pods, nodes");
    }

    #[test]
    fn random_selection_covers_every_size() {
        let mut rng = StdRng::seed_from_u64(42);
        let eligible = InstanceKind::Vm.eligible_defects().len();

        let mut sizes_seen = vec![false; eligible + 1];
        for _ in 0..2_000 {
            sizes_seen[DefectSet::random(&InstanceKind::Vm, &mut rng).len()] = true;
        }

        assert!(!sizes_seen[0]);
        assert!(sizes_seen[1..].iter().all(|seen| *seen));
    }

    proptest! {
        #[test]
        fn property_test_random_defects_are_eligible_and_non_empty(kind_idx in 0usize..3, seed: u64) {
            let kind = KINDS[kind_idx];
            let defects = DefectSet::random(&kind, &mut StdRng::seed_from_u64(seed));

            prop_assert!(!defects.is_empty());
            prop_assert!(defects.len() <= kind.eligible_defects().len());
            for defect in defects.iter() {
                prop_assert!(kind.eligible_defects().contains(&defect));
            }
        }
    }
}
