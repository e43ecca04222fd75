// Job counts per account and per user.  The two collectors run the same squeue listing with a
// different owner column and emit the same four families under different prefixes.

use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::parse_owner_jobs;

struct OwnerFamilies {
    pending: Family,
    running: Family,
    running_cpus: Family,
    suspended: Family,
}

static ACCOUNT_FAMILIES: OwnerFamilies = OwnerFamilies {
    pending: Family::new("slurm_account_jobs_pending", "Pending jobs for account", &["account"]),
    running: Family::new("slurm_account_jobs_running", "Running jobs for account", &["account"]),
    running_cpus: Family::new("slurm_account_cpus_running", "Running cpus for account", &["account"]),
    suspended: Family::new("slurm_account_jobs_suspended", "Suspended jobs for account", &["account"]),
};

static USER_FAMILIES: OwnerFamilies = OwnerFamilies {
    pending: Family::new("slurm_user_jobs_pending", "Pending jobs for user", &["user"]),
    running: Family::new("slurm_user_jobs_running", "Running jobs for user", &["user"]),
    running_cpus: Family::new("slurm_user_cpus_running", "Running cpus for user", &["user"]),
    suspended: Family::new("slurm_user_jobs_suspended", "Suspended jobs for user", &["user"]),
};

pub struct OwnerJobsCollector {
    name: &'static str,
    format: &'static str,
    families: &'static OwnerFamilies,
}

impl OwnerJobsCollector {
    pub fn accounts() -> OwnerJobsCollector {
        OwnerJobsCollector {
            name: "accounts",
            format: "%A|%a|%T|%C",
            families: &ACCOUNT_FAMILIES,
        }
    }

    pub fn users() -> OwnerJobsCollector {
        OwnerJobsCollector {
            name: "users",
            format: "%A|%u|%T|%C",
            families: &USER_FAMILIES,
        }
    }
}

#[async_trait]
impl Collector for OwnerJobsCollector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn families(&self) -> Vec<&'static Family> {
        let f = self.families;
        vec![&f.pending, &f.running, &f.running_cpus, &f.suspended]
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("squeue", &["-a", "-r", "-h", "-o", self.format]).await?;
        let parsed = parse_owner_jobs(&output);
        let f = self.families;
        for (owner, counts) in &parsed.value {
            let labels = [owner.as_str()];
            batch.positive(&f.pending, &labels, counts.pending)?;
            batch.positive(&f.running, &labels, counts.running)?;
            batch.positive(&f.running_cpus, &labels, counts.running_cpus)?;
            batch.positive(&f.suspended, &labels, counts.suspended)?;
        }
        Ok(parsed.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::{sample, sample_count};

    const LISTING: &str = "\
100|physics|RUNNING|32
101|physics|PENDING|8
102|chem|PENDING|4
";

    #[tokio::test]
    async fn test_accounts() {
        let runner = FakeRunner::new().with("squeue -a -r -h -o %A|%a|%T|%C", LISTING);
        let mut batch = MetricBatch::new();
        OwnerJobsCollector::accounts().collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();
        let physics = [("account", "physics")];
        assert!(sample(&families, "slurm_account_jobs_running", &physics) == Some(1.0));
        assert!(sample(&families, "slurm_account_cpus_running", &physics) == Some(32.0));
        assert!(sample(&families, "slurm_account_jobs_pending", &physics) == Some(1.0));
        assert!(sample(&families, "slurm_account_jobs_pending", &[("account", "chem")]) == Some(1.0));

        // chem has nothing running and nobody has anything suspended.
        assert!(sample(&families, "slurm_account_jobs_running", &[("account", "chem")]).is_none());
        assert!(sample_count(&families, "slurm_account_jobs_suspended") == 0);
    }

    #[tokio::test]
    async fn test_users() {
        let runner = FakeRunner::new().with("squeue -a -r -h -o %A|%u|%T|%C", "7|alice|RUNNING|2\n");
        let mut batch = MetricBatch::new();
        let c = OwnerJobsCollector::users();
        assert!(c.name() == "users");
        c.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();
        assert!(sample(&families, "slurm_user_cpus_running", &[("user", "alice")]) == Some(2.0));
    }
}
