// GPU accounting needs three sinfo listings: all nodes with their installed GPUs, allocated nodes
// with the GPUs in use, and the nodes that can still take work with both columns.

use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::{parse_allocated_gpus, parse_idle_gpus, parse_total_gpus, GpuCounts};

const ALLOC: Family = Family::new("slurm_gpus_alloc", "Allocated GPUs", &[]);
const IDLE: Family = Family::new("slurm_gpus_idle", "Idle GPUs", &[]);
const OTHER: Family = Family::new("slurm_gpus_other", "Other GPUs", &[]);
const TOTAL: Family = Family::new("slurm_gpus_total", "Total GPUs", &[]);
const UTILIZATION: Family = Family::new("slurm_gpus_utilization", "Total GPU utilization", &[]);

static FAMILIES: [Family; 5] = [ALLOC, IDLE, OTHER, TOTAL, UTILIZATION];

const TOTAL_ARGS: &[&str] = &["-a", "-h", "--Format=Nodes: ,Gres:"];
const ALLOCATED_ARGS: &[&str] = &["-a", "-h", "--Format=Nodes: ,GresUsed:", "--state=allocated"];
const IDLE_ARGS: &[&str] = &["-a", "-h", "--Format=Nodes: ,Gres: ,GresUsed:", "--state=idle,allocated"];

pub struct GpusCollector;

#[async_trait]
impl Collector for GpusCollector {
    fn name(&self) -> &'static str {
        "gpus"
    }

    fn families(&self) -> Vec<&'static Family> {
        FAMILIES.iter().collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let total = parse_total_gpus(&runner.run("sinfo", TOTAL_ARGS).await?);
        let allocated = parse_allocated_gpus(&runner.run("sinfo", ALLOCATED_ARGS).await?);
        let idle = parse_idle_gpus(&runner.run("sinfo", IDLE_ARGS).await?);

        let gpus = GpuCounts::derive(total.value, allocated.value, idle.value);
        batch.set(&ALLOC, &[], gpus.allocated)?;
        batch.set(&IDLE, &[], gpus.idle)?;
        batch.set(&OTHER, &[], gpus.other)?;
        batch.set(&TOTAL, &[], gpus.total)?;
        batch.set(&UTILIZATION, &[], gpus.utilization)?;

        Ok(total.parse_errors + allocated.parse_errors + idle.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::sample;

    #[tokio::test]
    async fn test_gpus() {
        let runner = FakeRunner::new()
            .with("sinfo -a -h --Format=Nodes: ,Gres:", "1 gpu:5\n2 (null)\n")
            .with("sinfo -a -h --Format=Nodes: ,GresUsed: --state=allocated", "1 gpu:2\n")
            .with(
                "sinfo -a -h --Format=Nodes: ,Gres: ,GresUsed: --state=idle,allocated",
                "1 gpu:5 gpu:2\n",
            );
        let mut batch = MetricBatch::new();
        GpusCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();
        assert!(sample(&families, "slurm_gpus_total", &[]) == Some(5.0));
        assert!(sample(&families, "slurm_gpus_alloc", &[]) == Some(2.0));
        assert!(sample(&families, "slurm_gpus_idle", &[]) == Some(3.0));
        assert!(sample(&families, "slurm_gpus_other", &[]) == Some(0.0));
        assert!(sample(&families, "slurm_gpus_utilization", &[]) == Some(0.4));
    }

    #[tokio::test]
    async fn test_no_gpus() {
        let runner = FakeRunner::new()
            .with("sinfo -a -h --Format=Nodes: ,Gres:", "8 (null)\n")
            .with("sinfo -a -h --Format=Nodes: ,GresUsed: --state=allocated", "")
            .with("sinfo -a -h --Format=Nodes: ,Gres: ,GresUsed: --state=idle,allocated", "");
        let mut batch = MetricBatch::new();
        GpusCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();
        assert!(sample(&families, "slurm_gpus_utilization", &[]) == Some(0.0));
    }
}
