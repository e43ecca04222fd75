use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::parse_jobs;

const LABELS: &[&str] = &["job", "name", "status", "reason", "partition", "user"];

const CPUS: Family = Family::new("slurm_job_cpus", "Number of CPUs allocated or requested by the job", LABELS);
const STATUS: Family = Family::new("slurm_job_status", "Job present in the queue, always 1", LABELS);

static FAMILIES: [Family; 2] = [CPUS, STATUS];

pub struct JobsCollector;

#[async_trait]
impl Collector for JobsCollector {
    fn name(&self) -> &'static str {
        "jobs"
    }

    fn families(&self) -> Vec<&'static Family> {
        FAMILIES.iter().collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("squeue", &["-h", "-o", "%P|%T|%C|%i|%j|%r|%u"]).await?;
        let parsed = parse_jobs(&output);
        for (id, job) in &parsed.value {
            for partition in &job.partitions {
                let labels = [
                    id.as_str(),
                    job.name.as_str(),
                    job.status.as_str(),
                    job.reason.as_str(),
                    partition.as_str(),
                    job.user.as_str(),
                ];
                batch.set(&CPUS, &labels, job.cpus)?;
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
    async fn test_jobs() {
        let listing = "\
normal|RUNNING|32|4711|train|None|alice
gpu|PENDING|8|4712|sweep|Priority|bob
long|PENDING|8|4712|sweep|Priority|bob
";
        let runner = FakeRunner::new().with("squeue -h -o %P|%T|%C|%i|%j|%r|%u", listing);
        let mut batch = MetricBatch::new();
        JobsCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();

        let j = [("job", "4711"), ("name", "train"), ("status", "RUNNING"), ("user", "alice")];
        assert!(sample(&families, "slurm_job_cpus", &j) == Some(32.0));
        assert!(sample(&families, "slurm_job_status", &j) == Some(1.0));

        // One sample per partition the job is queued in.
        assert!(sample_count(&families, "slurm_job_status") == 3);
        assert!(sample(&families, "slurm_job_cpus", &[("job", "4712"), ("partition", "long")]) == Some(8.0));
    }
}
