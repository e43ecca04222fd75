// A scrape runs every enabled collector concurrently.  Each collector has its own lock, so a slow
// collector is never entered twice by overlapping scrapes, while different collectors still run in
// parallel.  A collector whose commands fail contributes no families to the scrape, only its
// self-metrics.

use crate::collectors::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::{bail, Result};
use futures::future::join_all;
use prometheus::proto::MetricFamily;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

static SUCCESS: Family = Family::new(
    "slurm_exporter_collector_success",
    "Whether the collector's commands ran and their output was collected",
    &["collector"],
);
static DURATION: Family = Family::new(
    "slurm_exporter_collector_duration_seconds",
    "Time spent by the collector in the last scrape",
    &["collector"],
);
static PARSE_ERRORS: Family = Family::new(
    "slurm_exporter_parse_errors",
    "Fields or lines in command output that could not be decoded in the last scrape",
    &["collector"],
);

struct Slot {
    collector: Box<dyn Collector>,
    busy: Mutex<()>,
}

struct Outcome {
    name: &'static str,
    elapsed: Duration,
    result: Result<(MetricBatch, u64)>,
}

pub struct Exporter {
    runner: Arc<dyn CommandRunner>,
    slots: Vec<Slot>,
}

impl Exporter {
    /// Fails if two collectors claim the same family name.

    pub fn new(runner: Arc<dyn CommandRunner>, collectors: Vec<Box<dyn Collector>>) -> Result<Exporter> {
        let mut names = HashSet::new();
        for family in [&SUCCESS, &DURATION, &PARSE_ERRORS] {
            names.insert(family.name);
        }
        for c in &collectors {
            for family in c.families() {
                if !names.insert(family.name) {
                    bail!("Metric {} is registered twice (collector {})", family.name, c.name());
                }
            }
            debug!(collector = c.name(), families = c.families().len(), "enabled");
        }
        Ok(Exporter {
            runner,
            slots: collectors
                .into_iter()
                .map(|collector| Slot {
                    collector,
                    busy: Mutex::new(()),
                })
                .collect(),
        })
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.collector.name()).collect()
    }

    async fn run(&self, slot: &Slot) -> Outcome {
        let _guard = slot.busy.lock().await;
        let started = Instant::now();
        let mut batch = MetricBatch::new();
        let result = slot.collector.collect(self.runner.as_ref(), &mut batch).await;
        Outcome {
            name: slot.collector.name(),
            elapsed: started.elapsed(),
            result: result.map(|parse_errors| (batch, parse_errors)),
        }
    }

    /// Run all collectors and return their families followed by the exporter's own.

    pub async fn gather(&self) -> Vec<MetricFamily> {
        let outcomes = join_all(self.slots.iter().map(|slot| self.run(slot))).await;

        let mut families = vec![];
        let mut status = MetricBatch::new();
        for outcome in outcomes {
            let labels = [outcome.name];
            let (success, parse_errors) = match outcome.result {
                Ok((batch, parse_errors)) => {
                    if parse_errors > 0 {
                        warn!(collector = outcome.name, parse_errors, "unparsable command output");
                    }
                    families.extend(batch.into_families());
                    (1.0, parse_errors)
                }
                Err(e) => {
                    error!(collector = outcome.name, error = %format!("{e:#}"), "collection failed");
                    (0.0, 0)
                }
            };
            let recorded = status
                .set(&SUCCESS, &labels, success)
                .and_then(|_| status.set(&DURATION, &labels, outcome.elapsed.as_secs_f64()))
                .and_then(|_| status.set(&PARSE_ERRORS, &labels, parse_errors as f64));
            if let Err(e) = recorded {
                error!(collector = outcome.name, error = %e, "recording collector status");
            }
        }
        families.extend(status.into_families());
        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::collectors::CollectorName;
    use crate::metrics::{encode, sample, sample_count};

    fn exporter(runner: FakeRunner, names: &[CollectorName]) -> Exporter {
        Exporter::new(Arc::new(runner), names.iter().map(|n| n.build()).collect()).unwrap()
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let runner = FakeRunner::new()
            .with("sinfo -h -o %C", "3/13/0/16\n")
            .timing_out("sdiag");
        let e = exporter(runner, &[CollectorName::Cpus, CollectorName::Scheduler]);
        let families = e.gather().await;

        assert!(sample(&families, "slurm_cpus_total", &[]) == Some(16.0));
        assert!(sample_count(&families, "slurm_scheduler_threads") == 0);

        let ok = [("collector", "cpus")];
        let failed = [("collector", "scheduler")];
        assert!(sample(&families, "slurm_exporter_collector_success", &ok) == Some(1.0));
        assert!(sample(&families, "slurm_exporter_collector_success", &failed) == Some(0.0));
        assert!(sample(&families, "slurm_exporter_collector_duration_seconds", &failed).is_some());
    }

    #[tokio::test]
    async fn test_status_recorded_for_every_collector() {
        let runner = FakeRunner::new().with("sinfo -h -o %C", "3/13/0/16\n");
        let e = exporter(runner, &[CollectorName::Cpus, CollectorName::Fairshare, CollectorName::Gpus]);
        let families = e.gather().await;
        for family in [&SUCCESS, &DURATION, &PARSE_ERRORS] {
            assert!(sample_count(&families, family.name) == 3);
        }
        assert!(sample(&families, "slurm_exporter_parse_errors", &[("collector", "gpus")]) == Some(0.0));
    }

    #[tokio::test]
    async fn test_parse_errors_are_reported() {
        let runner = FakeRunner::new().with("sinfo -h -o %C", "3/x/0/16\n");
        let e = exporter(runner, &[CollectorName::Cpus]);
        let families = e.gather().await;
        assert!(sample(&families, "slurm_exporter_parse_errors", &[("collector", "cpus")]) == Some(1.0));
        assert!(sample(&families, "slurm_cpus_idle", &[]) == Some(0.0));
    }

    #[tokio::test]
    async fn test_scrapes_are_independent() {
        let runner = FakeRunner::new().with("squeue -a -r -h -o %A|%u|%T|%C", "1|alice|RUNNING|4\n");
        let e = exporter(runner, &[CollectorName::Users]);
        let first = e.gather().await;
        let second = e.gather().await;
        assert!(sample(&first, "slurm_user_jobs_running", &[("user", "alice")]) == Some(1.0));
        assert!(sample(&second, "slurm_user_jobs_running", &[("user", "alice")]) == Some(1.0));
    }

    #[tokio::test]
    async fn test_exposition_encodes() {
        let runner = FakeRunner::new().with("sinfo -h -o %C", "3/13/0/16\n");
        let e = exporter(runner, &[CollectorName::Cpus, CollectorName::Fairshare]);
        let (_, body) = encode(&e.gather().await).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("slurm_cpus_alloc 3"));
        assert!(text.contains("slurm_exporter_collector_success{collector=\"fairshare\"} 0"));
    }

    #[test]
    fn test_duplicate_collectors_rejected() {
        let r = Exporter::new(
            Arc::new(FakeRunner::new()),
            vec![CollectorName::Cpus.build(), CollectorName::Cpus.build()],
        );
        assert!(r.is_err());
    }
}
