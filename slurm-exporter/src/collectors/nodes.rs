// Node counts per partition, state and feature set, plus the cluster node total.  sinfo is run once
// to list the partitions and then once per partition.

use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use slurmparse::{count_nodes, parse_feature_sets, parse_partition_names, NodeState};

const LABELS: &[&str] = &["partition", "active_feature_set"];

static STATE_FAMILIES: [(NodeState, Family); 12] = [
    (NodeState::Allocated, Family::new("slurm_nodes_alloc", "Allocated nodes", LABELS)),
    (NodeState::Completing, Family::new("slurm_nodes_comp", "Completing nodes", LABELS)),
    (NodeState::Down, Family::new("slurm_nodes_down", "Down nodes", LABELS)),
    (NodeState::Drained, Family::new("slurm_nodes_drain", "Drain nodes", LABELS)),
    (NodeState::Failed, Family::new("slurm_nodes_fail", "Fail nodes", LABELS)),
    (NodeState::Error, Family::new("slurm_nodes_err", "Error nodes", LABELS)),
    (NodeState::Idle, Family::new("slurm_nodes_idle", "Idle nodes", LABELS)),
    (NodeState::Maintenance, Family::new("slurm_nodes_maint", "Maint nodes", LABELS)),
    (NodeState::Mixed, Family::new("slurm_nodes_mix", "Mix nodes", LABELS)),
    (NodeState::Reserved, Family::new("slurm_nodes_resv", "Reserved nodes", LABELS)),
    (NodeState::Planned, Family::new("slurm_nodes_planned", "Planned nodes", LABELS)),
    (NodeState::Other, Family::new("slurm_nodes_other", "Nodes reported with an unknown state", LABELS)),
];

static TOTAL: Family = Family::new("slurm_nodes_total", "Total number of nodes", &[]);

pub struct NodesCollector;

#[async_trait]
impl Collector for NodesCollector {
    fn name(&self) -> &'static str {
        "nodes"
    }

    fn families(&self) -> Vec<&'static Family> {
        let mut fs = STATE_FAMILIES.iter().map(|(_, f)| f).collect::<Vec<_>>();
        fs.push(&TOTAL);
        fs
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let mut parse_errors = 0;

        let output = runner.run("sinfo", &["-h", "-o", "%R"]).await?;
        for partition in parse_partition_names(&output) {
            let output = runner
                .run("sinfo", &["-h", "-o", "%D|%T|%b", "-p", partition.as_str()])
                .await
                .with_context(|| format!("Listing nodes of partition {partition}"))?;
            let parsed = parse_feature_sets(&output);
            parse_errors += parsed.parse_errors;
            for (features, states) in &parsed.value {
                for (state, family) in &STATE_FAMILIES {
                    let count = states.get(state).copied().unwrap_or(0.0);
                    batch.positive(family, &[partition.as_str(), features.as_str()], count)?;
                }
            }
        }

        let output = runner.run("scontrol", &["show", "nodes", "-o"]).await?;
        batch.set(&TOTAL, &[], count_nodes(&output))?;

        Ok(parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::{sample, sample_count};

    fn runner() -> FakeRunner {
        FakeRunner::new()
            .with("sinfo -h -o %R", "normal\ngpu\n")
            .with(
                "sinfo -h -o %D|%T|%b -p normal",
                "10|idle|b,a\n10|idle|a,b\n4|down*|(null)\n",
            )
            .with("sinfo -h -o %D|%T|%b -p gpu", "2|mixed|a100\n")
            .with("scontrol show nodes -o", "NodeName=c1\nNodeName=c2\nNodeName=g1\n")
    }

    #[tokio::test]
    async fn test_nodes() {
        let mut batch = MetricBatch::new();
        NodesCollector.collect(&runner(), &mut batch).await.unwrap();
        let families = batch.into_families();

        let normal_ab = [("partition", "normal"), ("active_feature_set", "a,b")];
        assert!(sample(&families, "slurm_nodes_idle", &normal_ab) == Some(20.0));
        let normal_null = [("partition", "normal"), ("active_feature_set", "null")];
        assert!(sample(&families, "slurm_nodes_down", &normal_null) == Some(4.0));
        let gpu = [("partition", "gpu"), ("active_feature_set", "a100")];
        assert!(sample(&families, "slurm_nodes_mix", &gpu) == Some(2.0));
        assert!(sample_count(&families, "slurm_nodes_alloc") == 0);
        assert!(sample(&families, "slurm_nodes_total", &[]) == Some(3.0));
    }

    #[tokio::test]
    async fn test_nodes_partition_listing_fails() {
        let runner = FakeRunner::new()
            .with("sinfo -h -o %R", "normal\n")
            .timing_out("sinfo -h -o %D|%T|%b -p normal")
            .with("scontrol show nodes -o", "NodeName=c1\n");
        let mut batch = MetricBatch::new();
        let err = NodesCollector.collect(&runner, &mut batch).await.unwrap_err();
        assert!(format!("{err:#}").contains("partition normal"));
    }
}
