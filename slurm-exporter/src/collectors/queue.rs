use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::{parse_queue, JobState};

const BY_USER: &[&str] = &["user", "partition"];
const BY_REASON: &[&str] = &["user", "partition", "reason"];

// (state, job family, core family)
static STATE_FAMILIES: [(JobState, Family, Family); 11] = [
    (
        JobState::Pending,
        Family::new("slurm_queue_pending", "Pending jobs in queue", BY_REASON),
        Family::new("slurm_cores_pending", "Pending cores in queue", BY_REASON),
    ),
    (
        JobState::Running,
        Family::new("slurm_queue_running", "Running jobs in the cluster", BY_USER),
        Family::new("slurm_cores_running", "Running cores in the cluster", BY_USER),
    ),
    (
        JobState::Suspended,
        Family::new("slurm_queue_suspended", "Suspended jobs in the cluster", BY_USER),
        Family::new("slurm_cores_suspended", "Suspended cores in the cluster", BY_USER),
    ),
    (
        JobState::Cancelled,
        Family::new("slurm_queue_cancelled", "Cancelled jobs in the cluster", BY_USER),
        Family::new("slurm_cores_cancelled", "Cancelled cores in the cluster", BY_USER),
    ),
    (
        JobState::Completing,
        Family::new("slurm_queue_completing", "Completing jobs in the cluster", BY_USER),
        Family::new("slurm_cores_completing", "Completing cores in the cluster", BY_USER),
    ),
    (
        JobState::Completed,
        Family::new("slurm_queue_completed", "Completed jobs in the cluster", BY_USER),
        Family::new("slurm_cores_completed", "Completed cores in the cluster", BY_USER),
    ),
    (
        JobState::Configuring,
        Family::new("slurm_queue_configuring", "Configuring jobs in the cluster", BY_USER),
        Family::new("slurm_cores_configuring", "Configuring cores in the cluster", BY_USER),
    ),
    (
        JobState::Failed,
        Family::new("slurm_queue_failed", "Number of failed jobs", BY_USER),
        Family::new("slurm_cores_failed", "Number of failed cores", BY_USER),
    ),
    (
        JobState::Timeout,
        Family::new("slurm_queue_timeout", "Jobs stopped by timeout", BY_USER),
        Family::new("slurm_cores_timeout", "Cores stopped by timeout", BY_USER),
    ),
    (
        JobState::Preempted,
        Family::new("slurm_queue_preempted", "Number of preempted jobs", BY_USER),
        Family::new("slurm_cores_preempted", "Number of preempted cores", BY_USER),
    ),
    (
        JobState::NodeFail,
        Family::new("slurm_queue_node_fail", "Number of jobs stopped due to node fail", BY_USER),
        Family::new("slurm_cores_node_fail", "Number of cores stopped due to node fail", BY_USER),
    ),
];

pub struct QueueCollector;

#[async_trait]
impl Collector for QueueCollector {
    fn name(&self) -> &'static str {
        "queue"
    }

    fn families(&self) -> Vec<&'static Family> {
        STATE_FAMILIES
            .iter()
            .flat_map(|(_, jobs, cores)| [jobs, cores])
            .collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("squeue", &["-h", "-o", "%P,%T,%C,%r,%u"]).await?;
        let parsed = parse_queue(&output);
        for (state, jobs_family, cores_family) in &STATE_FAMILIES {
            let Some(groups) = parsed.value.states.get(state) else {
                continue;
            };
            for (key, counts) in groups {
                let mut labels = vec![key.user.as_str(), key.partition.as_str()];
                if let Some(reason) = &key.reason {
                    labels.push(reason.as_str());
                }
                batch.positive(jobs_family, &labels, counts.jobs)?;
                batch.positive(cores_family, &labels, counts.cores)?;
            }
        }
        Ok(parsed.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::sample;

    #[test]
    fn test_every_state_has_families() {
        for state in JobState::ALL {
            let (_, jobs, cores) = STATE_FAMILIES.iter().find(|(s, _, _)| *s == state).unwrap();
            assert!(jobs.name == format!("slurm_queue_{}", state.name()));
            assert!(cores.name == format!("slurm_cores_{}", state.name()));
        }
    }

    #[tokio::test]
    async fn test_queue() {
        let listing = "\
normal,RUNNING,32,None,alice
gpu,PENDING,8,Resources,bob
normal,SUSPENDED,12,None,alice
";
        let runner = FakeRunner::new().with("squeue -h -o %P,%T,%C,%r,%u", listing);
        let mut batch = MetricBatch::new();
        QueueCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();

        let alice = [("user", "alice"), ("partition", "normal")];
        assert!(sample(&families, "slurm_queue_running", &alice) == Some(1.0));
        assert!(sample(&families, "slurm_cores_running", &alice) == Some(32.0));
        assert!(sample(&families, "slurm_queue_suspended", &alice) == Some(1.0));
        assert!(sample(&families, "slurm_cores_suspended", &alice) == Some(12.0));

        let bob = [("user", "bob"), ("partition", "gpu"), ("reason", "Resources")];
        assert!(sample(&families, "slurm_queue_pending", &bob) == Some(1.0));
        assert!(sample(&families, "slurm_cores_pending", &bob) == Some(8.0));
    }
}
