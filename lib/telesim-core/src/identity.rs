use metrics::{Key, Label};

use crate::catalog::LABEL_NAMES;

/// Identity of a simulated instance.
///
/// Every series emitted by an instance is labeled with its identity, so the identity of an instance must not change
/// once its metrics are registered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceIdentity {
    id: String,
    tenant_id: String,
    region: String,
}

impl InstanceIdentity {
    /// Creates a new `InstanceIdentity`.
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            region: region.into(),
        }
    }

    /// Identifier of the instance.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the tenant owning the instance.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Region the instance is deployed in.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the label values of this identity, in label order.
    pub fn label_values(&self) -> [&str; 3] {
        [&self.id, &self.tenant_id, &self.region]
    }

    /// Returns the labels attached to every series of this instance.
    pub fn labels(&self) -> Vec<Label> {
        LABEL_NAMES
            .iter()
            .zip(self.label_values())
            .map(|(name, value)| Label::new(*name, value.to_string()))
            .collect()
    }

    /// Returns the registry key of the given series, as emitted by this instance.
    pub fn series_key(&self, series_name: &str) -> Key {
        Key::from_parts(series_name.to_string(), self.labels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_label_order() {
        let identity = InstanceIdentity::new("i-1", "t-1", "eu-west");
        let labels = identity
            .labels()
            .into_iter()
            .map(|label| (label.key().to_string(), label.value().to_string()))
            .collect::<Vec<_>>();

        assert_eq!(
            labels,
            vec![
                ("instance_id".to_string(), "i-1".to_string()),
                ("tenant_id".to_string(), "t-1".to_string()),
                ("region".to_string(), "eu-west".to_string()),
            ]
        );
    }

    #[test]
    fn series_key() {
        let identity = InstanceIdentity::new("i-1", "t-1", "eu-west");
        let key = identity.series_key("vm_cpu_usage");

        assert_eq!(key.name(), "vm_cpu_usage");
        assert_eq!(key.labels().count(), 3);
    }
}
