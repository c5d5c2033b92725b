use snafu::Snafu;

/// An error that prevents a simulated instance from being constructed.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum InstanceError {
    /// The requested instance type is not a known variant.
    #[snafu(display(
        "Instance type '{}' does not exist. Expected one of: VM, DBAAS, K8SAAS, STRESS_TEST.",
        instance_type
    ))]
    UnknownInstanceType {
        /// Instance type as it was requested.
        instance_type: String,
    },

    /// An explicitly requested defect is not eligible for the instance type.
    #[snafu(display(
        "Defect '{}' does not exist for instance type {}. Eligible defects: {}.",
        defect,
        instance_type,
        eligible.join(", ")
    ))]
    UnknownDefect {
        /// Defect name as it was requested.
        defect: String,

        /// Type tag of the instance the defect was requested for.
        instance_type: &'static str,

        /// Defects that are eligible for the instance type.
        eligible: &'static [&'static str],
    },

    /// A resolved value range cannot be sampled from.
    #[snafu(display("Value range [{}, {}] for metric '{}' is invalid: {}.", min, max, metric, reason))]
    InvalidRange {
        /// Short name of the metric.
        metric: String,

        /// Lower bound of the range.
        min: i64,

        /// Upper bound of the range.
        max: i64,

        /// Why the range was rejected.
        reason: &'static str,
    },
}
