//! Prometheus text exposition.

use std::fmt;

use metrics::Key;

use crate::registry::{MetricRegistry, SampleValue, SeriesKind};

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const NAME_BUFFER_SIZE: usize = 256;
const LABELS_BUFFER_SIZE: usize = 512;

impl MetricRegistry {
    /// Renders every registered series in the Prometheus text exposition format.
    ///
    /// Families are written in registration order, each preceded by its `# HELP` line (when a description was
    /// registered) and its `# TYPE` line. Counter names are suffixed with `_total`.
    pub fn render(&self) -> String {
        let mut payload = String::new();

        // Writing into a `String` cannot fail.
        let _ = self.render_into(&mut payload);
        payload
    }

    /// Renders every registered series into the given writer.
    ///
    /// # Errors
    ///
    /// If the writer returns an error, it is returned and rendering stops.
    pub fn render_into<W>(&self, writer: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let families = self.snapshot();

        let mut name_buf = String::with_capacity(NAME_BUFFER_SIZE);
        let mut labels_buf = String::with_capacity(LABELS_BUFFER_SIZE);

        for family in &families {
            normalize_metric_name(&family.name, family.kind, &mut name_buf);

            if let Some(description) = &family.description {
                writer.write_str("# HELP ")?;
                writer.write_str(&name_buf)?;
                writer.write_char(' ')?;
                write_escaped(writer, description, false)?;
                writer.write_char('\n')?;
            }
            writeln!(writer, "# TYPE {} {}", name_buf, family.kind.as_str())?;

            for (key, value) in &family.series {
                format_labels(&mut labels_buf, key)?;
                match value {
                    SampleValue::Counter(total) => write_sample(writer, &name_buf, &labels_buf, total)?,
                    SampleValue::Gauge(current) => write_sample(writer, &name_buf, &labels_buf, GaugeValue(*current))?,
                }
            }
        }

        Ok(())
    }
}

fn write_sample<W, V>(writer: &mut W, name: &str, labels: &str, value: V) -> fmt::Result
where
    W: fmt::Write,
    V: fmt::Display,
{
    writer.write_str(name)?;
    if !labels.is_empty() {
        writer.write_char('{')?;
        writer.write_str(labels)?;
        writer.write_char('}')?;
    }
    writeln!(writer, " {}", value)
}

fn format_labels(labels_buf: &mut String, key: &Key) -> fmt::Result {
    labels_buf.clear();

    for (i, label) in key.labels().enumerate() {
        if i > 0 {
            labels_buf.push(',');
        }

        labels_buf.push_str(label.key());
        labels_buf.push_str("=\"");
        write_escaped(labels_buf, label.value(), true)?;
        labels_buf.push('"');
    }

    Ok(())
}

fn write_escaped<W>(writer: &mut W, value: &str, escape_quotes: bool) -> fmt::Result
where
    W: fmt::Write,
{
    for c in value.chars() {
        match c {
            '\\' => writer.write_str("\\\\")?,
            '\n' => writer.write_str("\\n")?,
            '"' if escape_quotes => writer.write_str("\\\"")?,
            c => writer.write_char(c)?,
        }
    }

    Ok(())
}

fn normalize_metric_name(name: &str, kind: SeriesKind, name_buf: &mut String) {
    name_buf.clear();

    for (i, c) in name.chars().enumerate() {
        if i == 0 && is_valid_name_start_char(c) || i != 0 && is_valid_name_char(c) {
            name_buf.push(c);
        } else {
            // Periods become a pair of underscores so they stay distinguishable from other replaced characters.
            name_buf.push_str(if c == '.' { "__" } else { "_" });
        }
    }

    if kind == SeriesKind::Counter && !name_buf.ends_with("_total") {
        name_buf.push_str("_total");
    }
}

#[inline]
fn is_valid_name_start_char(c: char) -> bool {
    // Matches a regular expression of [a-zA-Z_:].
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

#[inline]
fn is_valid_name_char(c: char) -> bool {
    // Matches a regular expression of [a-zA-Z0-9_:].
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

struct GaugeValue(f64);

impl fmt::Display for GaugeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            f.write_str("NaN")
        } else if value.is_infinite() {
            f.write_str(if value > 0.0 { "+Inf" } else { "-Inf" })
        } else {
            write!(f, "{}", value)
        }
    }
}

#[cfg(test)]
mod tests {
    use metrics::{counter, describe_counter, describe_gauge, gauge, with_local_recorder};

    use super::*;

    #[test]
    fn renders_help_type_and_labels() {
        let registry = MetricRegistry::new();
        with_local_recorder(&registry, || {
            describe_gauge!("vm_cpu_usage", "CPU usage in percentage");
            gauge!("vm_cpu_usage", "instance_id" => "i-1", "tenant_id" => "t-1", "region" => "eu-west").set(42.0);
        });

        let payload = registry.render();
        assert_eq!(
            payload,
            "# HELP vm_cpu_usage CPU usage in percentage\n\
             # TYPE vm_cpu_usage gauge\n\
             vm_cpu_usage{instance_id=\"i-1\",tenant_id=\"t-1\",region=\"eu-west\"} 42\n"
        );
    }

    #[test]
    fn counters_get_total_suffix() {
        let registry = MetricRegistry::new();
        with_local_recorder(&registry, || {
            describe_counter!("dbaas_db_queries", "Number of database queries");
            counter!("dbaas_db_queries", "instance_id" => "i-1").increment(12);
        });

        let payload = registry.render();
        assert!(payload.contains("# HELP dbaas_db_queries_total Number of database queries\n"));
        assert!(payload.contains("# TYPE dbaas_db_queries_total counter\n"));
        assert!(payload.contains("dbaas_db_queries_total{instance_id=\"i-1\"} 12\n"));
    }

    #[test]
    fn families_render_in_registration_order() {
        let registry = MetricRegistry::new();
        with_local_recorder(&registry, || {
            gauge!("zeta").set(1.0);
            gauge!("alpha").set(2.0);
        });

        let payload = registry.render();
        let zeta = payload.find("# TYPE zeta gauge").unwrap();
        let alpha = payload.find("# TYPE alpha gauge").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn label_values_are_escaped() {
        let registry = MetricRegistry::new();
        with_local_recorder(&registry, || {
            gauge!("up", "region" => "eu\"west\\1\nb").set(1.0);
        });

        assert!(registry.render().contains(r#"up{region="eu\"west\\1\nb"} 1"#));
    }

    #[test]
    fn special_gauge_values() {
        assert_eq!(GaugeValue(f64::NAN).to_string(), "NaN");
        assert_eq!(GaugeValue(f64::INFINITY).to_string(), "+Inf");
        assert_eq!(GaugeValue(f64::NEG_INFINITY).to_string(), "-Inf");
        assert_eq!(GaugeValue(0.5).to_string(), "0.5");
        assert_eq!(GaugeValue(6000.0).to_string(), "6000");
    }

    #[test]
    fn invalid_name_characters_are_replaced() {
        let mut name_buf = String::new();
        normalize_metric_name("runtime.worker-count", SeriesKind::Gauge, &mut name_buf);
        assert_eq!(name_buf, "runtime__worker_count");

        normalize_metric_name("9lives", SeriesKind::Counter, &mut name_buf);
        assert_eq!(name_buf, "_lives_total");
    }

    #[test]
    fn empty_registry_renders_nothing() {
        assert!(MetricRegistry::new().render().is_empty());
    }
}
