use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::{count_pending_by_partition, parse_partition_cpus};

const LABELS: &[&str] = &["partition"];

const ALLOCATED: Family = Family::new("slurm_partition_cpus_allocated", "Allocated CPUs for partition", LABELS);
const IDLE: Family = Family::new("slurm_partition_cpus_idle", "Idle CPUs for partition", LABELS);
const OTHER: Family = Family::new("slurm_partition_cpus_other", "Other CPUs for partition", LABELS);
const PENDING: Family = Family::new("slurm_partition_jobs_pending", "Pending jobs for partition", LABELS);
const TOTAL: Family = Family::new("slurm_partition_cpus_total", "Total CPUs for partition", LABELS);

static FAMILIES: [Family; 5] = [ALLOCATED, IDLE, OTHER, PENDING, TOTAL];

pub struct PartitionsCollector;

#[async_trait]
impl Collector for PartitionsCollector {
    fn name(&self) -> &'static str {
        "partitions"
    }

    fn families(&self) -> Vec<&'static Family> {
        FAMILIES.iter().collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let cpus = runner.run("sinfo", &["-h", "-o%R,%C"]).await?;
        let pending = runner
            .run("squeue", &["-a", "-r", "-h", "-o%P", "--states=PENDING"])
            .await?;
        let mut parsed = parse_partition_cpus(&cpus);
        count_pending_by_partition(&mut parsed.value, &pending);

        for (name, p) in &parsed.value {
            let labels = [name.as_str()];
            batch.positive(&ALLOCATED, &labels, p.cpus.allocated)?;
            batch.positive(&IDLE, &labels, p.cpus.idle)?;
            batch.positive(&OTHER, &labels, p.cpus.other)?;
            batch.positive(&TOTAL, &labels, p.cpus.total)?;
            batch.positive(&PENDING, &labels, p.pending_jobs)?;
        }
        Ok(parsed.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::sample;

    #[tokio::test]
    async fn test_partitions() {
        let runner = FakeRunner::new()
            .with("sinfo -h -o%R,%C", "normal,3/13/0/16\ngpu,0/8/0/8\n")
            .with("squeue -a -r -h -o%P --states=PENDING", "normal\nnormal\nretired\n");
        let mut batch = MetricBatch::new();
        PartitionsCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();

        let normal = [("partition", "normal")];
        assert!(sample(&families, "slurm_partition_cpus_allocated", &normal) == Some(3.0));
        assert!(sample(&families, "slurm_partition_cpus_total", &normal) == Some(16.0));
        assert!(sample(&families, "slurm_partition_jobs_pending", &normal) == Some(2.0));

        let gpu = [("partition", "gpu")];
        assert!(sample(&families, "slurm_partition_cpus_idle", &gpu) == Some(8.0));
        assert!(sample(&families, "slurm_partition_cpus_allocated", &gpu).is_none());
        assert!(sample(&families, "slurm_partition_jobs_pending", &gpu).is_none());
        assert!(sample(&families, "slurm_partition_jobs_pending", &[("partition", "retired")]).is_none());
    }
}
