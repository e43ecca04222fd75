use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::{parse_scheduler_diagnostics, RpcStats, SchedulerDiagnostics};
use std::collections::HashMap;

// Scalar families and the field each one reports.
static SCALARS: [(Family, fn(&SchedulerDiagnostics) -> f64); 12] = [
    (
        Family::new("slurm_scheduler_threads", "Information provided by the Slurm sdiag command, number of scheduler threads", &[]),
        |d| d.threads,
    ),
    (
        Family::new("slurm_scheduler_queue_size", "Information provided by the Slurm sdiag command, length of the scheduler queue", &[]),
        |d| d.queue_size,
    ),
    (
        Family::new("slurm_scheduler_dbd_queue_size", "Information provided by the Slurm sdiag command, length of the DBD agent queue", &[]),
        |d| d.dbd_queue_size,
    ),
    (
        Family::new("slurm_scheduler_last_cycle", "Information provided by the Slurm sdiag command, scheduler last cycle time in (microseconds)", &[]),
        |d| d.last_cycle,
    ),
    (
        Family::new("slurm_scheduler_mean_cycle", "Information provided by the Slurm sdiag command, scheduler mean cycle time in (microseconds)", &[]),
        |d| d.mean_cycle,
    ),
    (
        Family::new("slurm_scheduler_cycle_per_minute", "Information provided by the Slurm sdiag command, number scheduler cycles per minute", &[]),
        |d| d.cycles_per_minute,
    ),
    (
        Family::new("slurm_scheduler_backfill_last_cycle", "Information provided by the Slurm sdiag command, scheduler backfill last cycle time in (microseconds)", &[]),
        |d| d.backfill_last_cycle,
    ),
    (
        Family::new("slurm_scheduler_backfill_mean_cycle", "Information provided by the Slurm sdiag command, scheduler backfill mean cycle time in (microseconds)", &[]),
        |d| d.backfill_mean_cycle,
    ),
    (
        Family::new("slurm_scheduler_backfill_depth_mean", "Information provided by the Slurm sdiag command, scheduler backfill mean depth", &[]),
        |d| d.backfill_depth_mean,
    ),
    (
        Family::new("slurm_scheduler_backfilled_jobs_since_start_total", "Information provided by the Slurm sdiag command, number of jobs started thanks to backfilling since last slurm start", &[]),
        |d| d.backfilled_jobs_since_start,
    ),
    (
        Family::new("slurm_scheduler_backfilled_jobs_since_cycle_total", "Information provided by the Slurm sdiag command, number of jobs started thanks to backfilling since last time stats where reset", &[]),
        |d| d.backfilled_jobs_since_cycle,
    ),
    (
        Family::new("slurm_scheduler_backfilled_heterogeneous_total", "Information provided by the Slurm sdiag command, number of heterogeneous job components started thanks to backfilling since last Slurm start", &[]),
        |d| d.backfilled_heterogeneous,
    ),
];

struct RpcFamilies {
    count: Family,
    ave_time: Family,
    total_time: Family,
}

static RPC_BY_OPERATION: RpcFamilies = RpcFamilies {
    count: Family::new("slurm_rpc_stats", "Information provided by the Slurm sdiag command, rpc count statistic", &["operation"]),
    ave_time: Family::new("slurm_rpc_stats_avg_time", "Information provided by the Slurm sdiag command, rpc average time statistic", &["operation"]),
    total_time: Family::new("slurm_rpc_stats_total_time", "Information provided by the Slurm sdiag command, rpc total time statistic", &["operation"]),
};

static RPC_BY_USER: RpcFamilies = RpcFamilies {
    count: Family::new("slurm_user_rpc_stats", "Information provided by the Slurm sdiag command, rpc count statistic per user", &["user"]),
    ave_time: Family::new("slurm_user_rpc_stats_avg_time", "Information provided by the Slurm sdiag command, rpc average time statistic per user", &["user"]),
    total_time: Family::new("slurm_user_rpc_stats_total_time", "Information provided by the Slurm sdiag command, rpc total time statistic per user", &["user"]),
};

fn emit_rpc(batch: &mut MetricBatch, families: &RpcFamilies, table: &HashMap<String, RpcStats>) -> Result<()> {
    for (name, stats) in table {
        let labels = [name.as_str()];
        batch.set(&families.count, &labels, stats.count)?;
        batch.set(&families.ave_time, &labels, stats.ave_time)?;
        batch.set(&families.total_time, &labels, stats.total_time)?;
    }
    Ok(())
}

pub struct SchedulerCollector;

#[async_trait]
impl Collector for SchedulerCollector {
    fn name(&self) -> &'static str {
        "scheduler"
    }

    fn families(&self) -> Vec<&'static Family> {
        let mut fs = SCALARS.iter().map(|(f, _)| f).collect::<Vec<_>>();
        for rpc in [&RPC_BY_OPERATION, &RPC_BY_USER] {
            fs.extend([&rpc.count, &rpc.ave_time, &rpc.total_time]);
        }
        fs
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("sdiag", &[]).await?;
        let parsed = parse_scheduler_diagnostics(&output);
        let diag = &parsed.value;
        for (family, field) in &SCALARS {
            batch.set(family, &[], field(diag))?;
        }
        emit_rpc(batch, &RPC_BY_OPERATION, &diag.rpc_by_operation)?;
        emit_rpc(batch, &RPC_BY_USER, &diag.rpc_by_user)?;
        Ok(parsed.parse_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::metrics::sample;

    #[tokio::test]
    async fn test_scheduler() {
        let sdiag = "\
Server thread count:  3
Agent queue size:     1
DBD Agent queue size: 2

Main schedule statistics (microseconds):
\tLast cycle:   97209
\tMean cycle:   23514
\tCycles per minute: 4

Backfilling stats
\tTotal backfilled jobs (since last slurm start): 111544
\tLast cycle: 1942890
\tMean cycle: 1457390
\tDepth Mean: 15721

Remote Procedure Call statistics by message type
\tREQUEST_FED_INFO                        ( 2049) count:149493 ave_time:93     total_time:14000135

Remote Procedure Call statistics by user
\troot            (       0) count:1076939 ave_time:86     total_time:93007287
";
        let runner = FakeRunner::new().with("sdiag", sdiag);
        let mut batch = MetricBatch::new();
        SchedulerCollector.collect(&runner, &mut batch).await.unwrap();
        let families = batch.into_families();

        assert!(sample(&families, "slurm_scheduler_threads", &[]) == Some(3.0));
        assert!(sample(&families, "slurm_scheduler_dbd_queue_size", &[]) == Some(2.0));
        assert!(sample(&families, "slurm_scheduler_last_cycle", &[]) == Some(97209.0));
        assert!(sample(&families, "slurm_scheduler_backfill_last_cycle", &[]) == Some(1942890.0));
        assert!(sample(&families, "slurm_scheduler_backfill_depth_mean", &[]) == Some(15721.0));
        assert!(sample(&families, "slurm_scheduler_backfilled_jobs_since_start_total", &[]) == Some(111544.0));
        assert!(sample(&families, "slurm_scheduler_backfilled_heterogeneous_total", &[]) == Some(0.0));
        assert!(sample(&families, "slurm_rpc_stats", &[("operation", "REQUEST_FED_INFO")]) == Some(149493.0));
        assert!(sample(&families, "slurm_user_rpc_stats_total_time", &[("user", "root")]) == Some(93007287.0));
    }
}
