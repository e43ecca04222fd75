use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::parse_fairshare;

static FAIRSHARE: Family = Family::new("slurm_account_fairshare", "FairShare for account", &["account"]);

pub struct FairshareCollector;

#[async_trait]
impl Collector for FairshareCollector {
    fn name(&self) -> &'static str {
        "fairshare"
    }

    fn families(&self) -> Vec<&'static Family> {
        vec![&FAIRSHARE]
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("sshare", &["-n", "-P", "-o", "account,fairshare"]).await?;
        let parsed = parse_fairshare(&output);
        for (account, fairshare) in &parsed.value {
            batch.set(&FAIRSHARE, &[account.as_str()], *fairshare)?;
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
    async fn test_fairshare() {
        let runner = FakeRunner::new().with(
            "sshare -n -P -o account,fairshare",
            "root|0.500000\n physics|0.714286\n  physics|0.250000\n",
        );
        let mut batch = MetricBatch::new();
        FairshareCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();
        assert!(sample(&families, "slurm_account_fairshare", &[("account", "physics")]) == Some(0.714286));
        assert!(sample_count(&families, "slurm_account_fairshare") == 2);
    }
}
