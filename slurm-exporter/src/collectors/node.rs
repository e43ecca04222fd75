use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::parse_node_details;

const LABELS: &[&str] = &["node", "status", "partition", "reason", "user", "timestamp"];

const CPU_ALLOC: Family = Family::new("slurm_node_cpu_alloc", "Allocated CPUs per node", LABELS);
const CPU_IDLE: Family = Family::new("slurm_node_cpu_idle", "Idle CPUs per node", LABELS);
const CPU_OTHER: Family = Family::new("slurm_node_cpu_other", "Other CPUs per node", LABELS);
const CPU_TOTAL: Family = Family::new("slurm_node_cpu_total", "Total CPUs per node", LABELS);
const MEM_ALLOC: Family = Family::new("slurm_node_mem_alloc", "Allocated memory per node", LABELS);
const MEM_TOTAL: Family = Family::new("slurm_node_mem_total", "Total memory per node", LABELS);
const STATUS: Family = Family::new("slurm_node_status", "Node status, always 1", LABELS);

static FAMILIES: [Family; 7] = [CPU_ALLOC, CPU_IDLE, CPU_OTHER, CPU_TOTAL, MEM_ALLOC, MEM_TOTAL, STATUS];

const FORMAT: &str = "NodeList:25,AllocMem,Memory,CPUsState,StateLong,Partition,Reason:30,UserLong,Timestamp";

pub struct NodeCollector;

#[async_trait]
impl Collector for NodeCollector {
    fn name(&self) -> &'static str {
        "node"
    }

    fn families(&self) -> Vec<&'static Family> {
        FAMILIES.iter().collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("sinfo", &["-h", "-N", "-O", FORMAT]).await?;
        let parsed = parse_node_details(&output);
        for (name, node) in &parsed.value {
            for partition in &node.partitions {
                let labels = [
                    name.as_str(),
                    node.status.as_str(),
                    partition.as_str(),
                    node.reason.as_str(),
                    node.user.as_str(),
                    node.timestamp.as_str(),
                ];
                batch.set(&CPU_ALLOC, &labels, node.cpus.allocated)?;
                batch.set(&CPU_IDLE, &labels, node.cpus.idle)?;
                batch.set(&CPU_OTHER, &labels, node.cpus.other)?;
                batch.set(&CPU_TOTAL, &labels, node.cpus.total)?;
                batch.set(&MEM_ALLOC, &labels, node.mem_alloc)?;
                batch.set(&MEM_TOTAL, &labels, node.mem_total)?;
                batch.set(&STATUS, &labels, 1.0)?;
            }
        }
        Ok(parsed.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::{sample, sample_count};

    #[tokio::test]
    async fn test_node() {
        let listing = "\
a048                     163840              193000              16/0/0/16           mixed               long                none                          Unknown             Unknown
a048                     163840              193000              16/0/0/16           mixed               gpu                 none                          Unknown             Unknown
b003                     296960              386000              0/0/32/32           down                long                Not responding                slurm(64030)        2024-02-11T09:12:44
";
        let cmdline = format!("sinfo -h -N -O {FORMAT}");
        let runner = FakeRunner::new().with(&cmdline, listing);
        let mut batch = MetricBatch::new();
        let errors = NodeCollector.collect(&runner, &mut batch).await.unwrap();
        assert!(errors == 0);
        let families = batch.into_families();

        // One series per node and partition.
        assert!(sample_count(&families, "slurm_node_status") == 3);

        let a048 = [("node", "a048"), ("partition", "gpu"), ("status", "mixed")];
        assert!(sample(&families, "slurm_node_mem_alloc", &a048) == Some(163840.0));
        assert!(sample(&families, "slurm_node_cpu_total", &a048) == Some(16.0));

        let b003 = [("node", "b003"), ("reason", "Not responding"), ("user", "slurm(64030)")];
        assert!(sample(&families, "slurm_node_cpu_other", &b003) == Some(32.0));
        assert!(sample(&families, "slurm_node_mem_total", &b003) == Some(386000.0));
    }
}
