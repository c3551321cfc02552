use std::fmt;

use crate::http_probe::result::ProbeOutcome;

pub const STAT_LABEL: &str = "stat";
pub const SENTRY_EVENTS_METRIC: &str = "sentry_events_total";
pub const SENTRY_RATE_LIMIT_METRIC: &str = "sentry_rate_limit_seconds_total";
const PROBE_SUCCESS_METRIC: &str = "probe_success";
const PROBE_DURATION_METRIC: &str = "probe_duration_seconds";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(value) => write!(f, "{}", value),
            MetricValue::Float(value) => write!(f, "{:.6}", value),
        }
    }
}

/// A single sample in the Prometheus text exposition format.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

impl Metric {
    pub fn new(name: &str, value: MetricValue) -> Self {
        Self {
            name: name.to_string(),
            labels: Vec::new(),
            value,
        }
    }

    pub fn with_label(mut self, name: &str, value: &str) -> Self {
        self.labels.push((name.to_string(), value.to_string()));
        self
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders one exposition line, without the trailing newline.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.labels.is_empty() {
            f.write_str("{")?;
            for (i, (name, value)) in self.labels.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}=\"{}\"", name, escape_label_value(value))?;
            }
            f.write_str("}")?;
        }
        write!(f, " {}", self.value)
    }
}

pub fn event_count_metric(stat: &str, count: i64) -> Metric {
    Metric::new(SENTRY_EVENTS_METRIC, MetricValue::Integer(count)).with_label(STAT_LABEL, stat)
}

pub fn rate_limit_metric(rate: f64) -> Metric {
    Metric::new(SENTRY_RATE_LIMIT_METRIC, MetricValue::Float(rate))
}

/// Creates the metrics describing the probe itself.
/// The metrics include:
///    - `probe_success`: 1 when every sub-request produced a line, 0 otherwise.
///    - `probe_duration_seconds`: Total time taken for the probe.
pub fn create_probe_metrics(outcome: &ProbeOutcome, duration_seconds: f64) -> Vec<Metric> {
    let probe_successful = match outcome.all_succeeded() {
        true => 1,
        false => 0,
    };

    vec![
        Metric::new(PROBE_SUCCESS_METRIC, MetricValue::Integer(probe_successful)),
        Metric::new(PROBE_DURATION_METRIC, MetricValue::Float(duration_seconds)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_probe::result::{SubProbe, SubProbeStatus};

    #[test]
    fn test_sentry_lines() {
        assert_eq!(
            event_count_metric("received", 12).to_string(),
            "sentry_events_total{stat=\"received\"} 12"
        );
        assert_eq!(
            rate_limit_metric(2.0).to_string(),
            "sentry_rate_limit_seconds_total 2.000000"
        );
        assert_eq!(
            rate_limit_metric(0.0).to_string(),
            "sentry_rate_limit_seconds_total 0.000000"
        );
    }

    #[test]
    fn test_label_values_are_escaped() {
        let metric = Metric::new("m", MetricValue::Integer(1))
            .with_label("a", "say \"hi\"\\\n")
            .with_label("b", "x");
        assert_eq!(metric.to_string(), "m{a=\"say \\\"hi\\\"\\\\\\n\",b=\"x\"} 1");
    }

    #[test]
    fn test_probe_metrics_reflect_partial_failure() {
        let mut outcome = ProbeOutcome {
            sub_probes: vec![SubProbe {
                name: "received".to_string(),
                path: "/stats/".to_string(),
                status: SubProbeStatus::EmittedWithoutData,
            }],
        };
        let metrics = create_probe_metrics(&outcome, 0.25);
        assert_eq!(metrics[0].to_string(), "probe_success 1");
        assert_eq!(metrics[1].to_string(), "probe_duration_seconds 0.250000");

        outcome.sub_probes.push(SubProbe {
            name: "rate_limit".to_string(),
            path: "/keys/".to_string(),
            status: SubProbeStatus::Rejected,
        });
        let metrics = create_probe_metrics(&outcome, 0.25);
        assert_eq!(metrics[0].to_string(), "probe_success 0");
    }
}
