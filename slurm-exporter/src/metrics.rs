// The metrics sink.  Each collector run fills a fresh `MetricBatch`; nothing survives between
// scrapes, so a family whose source failed simply does not appear in that scrape's output.

use anyhow::{bail, Result};
use prometheus::core::Collector as _;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, TextEncoder};
use std::collections::HashMap;

/// Static description of one gauge family.
#[derive(Debug)]
pub struct Family {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl Family {
    pub const fn new(name: &'static str, help: &'static str, labels: &'static [&'static str]) -> Family {
        Family { name, help, labels }
    }
}

#[derive(Default)]
pub struct MetricBatch {
    gauges: Vec<GaugeVec>,
    by_name: HashMap<&'static str, usize>,
}

impl MetricBatch {
    pub fn new() -> MetricBatch {
        MetricBatch::default()
    }

    /// Set one sample.  Setting the same label values twice keeps the last value.

    pub fn set(&mut self, family: &Family, labels: &[&str], value: f64) -> Result<()> {
        if labels.len() != family.labels.len() {
            bail!(
                "{} takes {} labels, got {}",
                family.name,
                family.labels.len(),
                labels.len()
            );
        }
        let ix = match self.by_name.get(family.name) {
            Some(ix) => *ix,
            None => {
                let vec = GaugeVec::new(Opts::new(family.name, family.help), family.labels)?;
                self.gauges.push(vec);
                self.by_name.insert(family.name, self.gauges.len() - 1);
                self.gauges.len() - 1
            }
        };
        self.gauges[ix].get_metric_with_label_values(labels)?.set(value);
        Ok(())
    }

    /// Like `set`, but drops the sample if the value is zero.  For per-entity counts, where a zero
    /// sample per idle user or partition would only add series.

    pub fn positive(&mut self, family: &Family, labels: &[&str], value: f64) -> Result<()> {
        if value > 0.0 {
            self.set(family, labels, value)
        } else {
            Ok(())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    pub fn into_families(self) -> Vec<MetricFamily> {
        self.gauges.iter().flat_map(|g| g.collect()).collect()
    }
}

/// Render families in the Prometheus text format.  Returns the content type and the body.

pub fn encode(families: &[MetricFamily]) -> Result<(String, Vec<u8>)> {
    let encoder = TextEncoder::new();
    let mut body = vec![];
    encoder.encode(families, &mut body)?;
    Ok((encoder.format_type().to_string(), body))
}

/// Find one sample by family name and a subset of its labels.
#[cfg(test)]
pub fn sample(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    families
        .iter()
        .filter(|f| f.get_name() == name)
        .flat_map(|f| f.get_metric().iter())
        .find(|m| {
            labels.iter().all(|(k, v)| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == *k && l.get_value() == *v)
            })
        })
        .map(|m| m.get_gauge().get_value())
}

#[cfg(test)]
pub fn sample_count(families: &[MetricFamily], name: &str) -> usize {
    families
        .iter()
        .filter(|f| f.get_name() == name)
        .map(|f| f.get_metric().len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOBS: Family = Family::new("slurm_test_jobs", "Jobs", &["user"]);
    const TOTAL: Family = Family::new("slurm_test_total", "Total", &[]);

    #[test]
    fn test_set_and_encode() {
        let mut batch = MetricBatch::new();
        batch.set(&JOBS, &["alice"], 3.0).unwrap();
        batch.set(&JOBS, &["bob"], 1.0).unwrap();
        batch.set(&JOBS, &["bob"], 2.0).unwrap();
        batch.set(&TOTAL, &[], 5.0).unwrap();
        let families = batch.into_families();
        assert!(sample(&families, "slurm_test_jobs", &[("user", "bob")]) == Some(2.0));
        assert!(sample_count(&families, "slurm_test_jobs") == 2);

        let (content_type, body) = encode(&families).unwrap();
        assert!(content_type.starts_with("text/plain"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("# HELP slurm_test_jobs Jobs"));
        assert!(text.contains("# TYPE slurm_test_jobs gauge"));
        assert!(text.contains("slurm_test_jobs{user=\"alice\"} 3"));
        assert!(text.contains("slurm_test_total 5"));
    }

    #[test]
    fn test_positive_drops_zero() {
        let mut batch = MetricBatch::new();
        batch.positive(&JOBS, &["alice"], 0.0).unwrap();
        assert!(batch.is_empty());
        batch.positive(&JOBS, &["alice"], 1.0).unwrap();
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_label_arity() {
        let mut batch = MetricBatch::new();
        assert!(batch.set(&JOBS, &[], 1.0).is_err());
        assert!(batch.set(&TOTAL, &["x"], 1.0).is_err());
    }
}
