use metrics::{counter, describe_counter, describe_gauge, gauge, with_local_recorder, Counter, Gauge, Label, SharedString};

use crate::MetricRegistry;

/// Builder for registering metrics that share a fixed set of labels.
///
/// Every metric registered through the builder carries the configured default labels, in the order they were added,
/// which keeps the label tuple identical across all series of a simulated resource.
#[derive(Clone)]
pub struct SeriesBuilder {
    registry: MetricRegistry,
    default_labels: Vec<Label>,
}

impl SeriesBuilder {
    /// Creates a new `SeriesBuilder` that registers metrics into the given registry.
    pub fn new(registry: &MetricRegistry) -> Self {
        Self {
            registry: registry.clone(),
            default_labels: Vec::new(),
        }
    }

    /// Adds a default label, applied to every metric registered afterwards.
    pub fn add_default_label<V>(mut self, key: &'static str, value: V) -> Self
    where
        V: Into<SharedString>,
    {
        self.default_labels.push(Label::new(key, value));
        self
    }

    /// Registers a gauge, along with its description.
    pub fn register_gauge(&self, metric_name: &str, description: &str) -> Gauge {
        let labels = self.default_labels.clone();
        with_local_recorder(&self.registry, || {
            describe_gauge!(metric_name.to_string(), description.to_string());
            gauge!(metric_name.to_string(), labels)
        })
    }

    /// Registers a counter, along with its description.
    pub fn register_counter(&self, metric_name: &str, description: &str) -> Counter {
        let labels = self.default_labels.clone();
        with_local_recorder(&self.registry, || {
            describe_counter!(metric_name.to_string(), description.to_string());
            counter!(metric_name.to_string(), labels)
        })
    }
}

#[cfg(test)]
mod tests {
    use metrics::Key;

    use super::*;

    #[test]
    fn default_labels_are_applied_in_order() {
        let registry = MetricRegistry::new();
        let builder = SeriesBuilder::new(&registry)
            .add_default_label("instance_id", "i-1")
            .add_default_label("tenant_id", String::from("t-1"));

        builder.register_gauge("vm_disk_io", "Disk I/O in operations per second").set(3.0);

        let key = Key::from_parts(
            "vm_disk_io",
            vec![Label::new("instance_id", "i-1"), Label::new("tenant_id", "t-1")],
        );
        assert_eq!(registry.gauge(key), Some(3.0));
        assert_eq!(
            registry.description("vm_disk_io").as_deref(),
            Some("Disk I/O in operations per second")
        );
    }

    #[test]
    fn counters_register_into_the_given_registry() {
        let registry = MetricRegistry::new();
        let builder = SeriesBuilder::new(&registry).add_default_label("region", "us-east");

        let queries = builder.register_counter("dbaas_db_queries", "Number of database queries");
        queries.increment(2);
        queries.increment(5);

        let key = Key::from_parts("dbaas_db_queries", vec![Label::new("region", "us-east")]);
        assert_eq!(registry.counter(key), Some(7));
    }
}
