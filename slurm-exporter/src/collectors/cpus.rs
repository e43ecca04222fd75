use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::parse_cpu_counts;

const ALLOC: Family = Family::new("slurm_cpus_alloc", "Allocated CPUs", &[]);
const IDLE: Family = Family::new("slurm_cpus_idle", "Idle CPUs", &[]);
const OTHER: Family = Family::new("slurm_cpus_other", "Mix CPUs", &[]);
const TOTAL: Family = Family::new("slurm_cpus_total", "Total CPUs", &[]);

static FAMILIES: [Family; 4] = [ALLOC, IDLE, OTHER, TOTAL];

pub struct CpusCollector;

#[async_trait]
impl Collector for CpusCollector {
    fn name(&self) -> &'static str {
        "cpus"
    }

    fn families(&self) -> Vec<&'static Family> {
        FAMILIES.iter().collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("sinfo", &["-h", "-o", "%C"]).await?;
        let parsed = parse_cpu_counts(&output);
        let cpus = parsed.value;
        batch.set(&ALLOC, &[], cpus.allocated)?;
        batch.set(&IDLE, &[], cpus.idle)?;
        batch.set(&OTHER, &[], cpus.other)?;
        batch.set(&TOTAL, &[], cpus.total)?;
        Ok(parsed.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::sample;

    #[tokio::test]
    async fn test_cpus() {
        let runner = FakeRunner::new().with("sinfo -h -o %C", "3/13/0/16\n");
        let mut batch = MetricBatch::new();
        let errors = CpusCollector.collect(&runner, &mut batch).await.unwrap();
        assert!(errors == 0);
        let families = batch.into_families();
        assert!(sample(&families, "slurm_cpus_alloc", &[]) == Some(3.0));
        assert!(sample(&families, "slurm_cpus_idle", &[]) == Some(13.0));
        assert!(sample(&families, "slurm_cpus_other", &[]) == Some(0.0));
        assert!(sample(&families, "slurm_cpus_total", &[]) == Some(16.0));
    }

    #[tokio::test]
    async fn test_cpus_command_fails() {
        let runner = FakeRunner::new();
        let mut batch = MetricBatch::new();
        assert!(CpusCollector.collect(&runner, &mut batch).await.is_err());
        assert!(batch.is_empty());
    }
}
