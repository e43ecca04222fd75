// Versions of the Slurm tools on this host.  A tool that cannot be run is reported with version
// "not_found" and value 0 rather than failing the collector.

use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use slurmparse::parse_version;
use tracing::debug;

static INFO: Family = Family::new(
    "slurm_info",
    "Information on installed Slurm binaries",
    &["type", "binary", "version"],
);

const BINARIES: [&str; 8] = ["sinfo", "squeue", "sdiag", "scontrol", "sacct", "sbatch", "salloc", "srun"];

pub struct InfoCollector;

#[async_trait]
impl Collector for InfoCollector {
    fn name(&self) -> &'static str {
        "info"
    }

    fn families(&self) -> Vec<&'static Family> {
        vec![&INFO]
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let probes = BINARIES.iter().map(|binary| async move {
            match runner.run(binary, &["--version"]).await {
                Ok(output) => (*binary, Some(parse_version(&output))),
                Err(e) => {
                    debug!(binary, error = %e, "no version");
                    (*binary, None)
                }
            }
        });
        let versions = join_all(probes).await;

        for (binary, version) in &versions {
            if *binary == "sinfo" {
                match version {
                    Some(v) => batch.set(&INFO, &["general", "", v], 1.0)?,
                    None => batch.set(&INFO, &["general", "", "not_found"], 0.0)?,
                }
            }
            match version {
                Some(v) => batch.set(&INFO, &["binary", binary, v], 1.0)?,
                None => batch.set(&INFO, &["binary", binary, "not_found"], 0.0)?,
            }
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::{sample, sample_count};

    #[tokio::test]
    async fn test_info() {
        let runner = FakeRunner::new()
            .with("sinfo --version", "slurm 23.11.6\n")
            .with("squeue --version", "slurm 23.11.6\n")
            .with("srun --version", "slurm\n");
        let mut batch = MetricBatch::new();
        InfoCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();

        let general = [("type", "general"), ("binary", ""), ("version", "23.11.6")];
        assert!(sample(&families, "slurm_info", &general) == Some(1.0));
        let squeue = [("type", "binary"), ("binary", "squeue"), ("version", "23.11.6")];
        assert!(sample(&families, "slurm_info", &squeue) == Some(1.0));
        let srun = [("binary", "srun"), ("version", "unknown")];
        assert!(sample(&families, "slurm_info", &srun) == Some(1.0));
        let sacct = [("binary", "sacct"), ("version", "not_found")];
        assert!(sample(&families, "slurm_info", &sacct) == Some(0.0));
        assert!(sample_count(&families, "slurm_info") == BINARIES.len() + 1);
    }
}
