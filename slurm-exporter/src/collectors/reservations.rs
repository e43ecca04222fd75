use super::Collector;
use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use slurmparse::parse_reservations;

const INFO: Family = Family::new(
    "slurm_reservation_info",
    "A metric with a constant '1' value labeled by reservation details",
    &["reservation_name", "state", "users", "nodes", "partition", "flags"],
);
const START_TIME: Family = Family::new(
    "slurm_reservation_start_time_seconds",
    "The start time of the reservation in seconds since the Unix epoch",
    &["reservation_name"],
);
const END_TIME: Family = Family::new(
    "slurm_reservation_end_time_seconds",
    "The end time of the reservation in seconds since the Unix epoch",
    &["reservation_name"],
);
const NODE_COUNT: Family = Family::new(
    "slurm_reservation_node_count",
    "The number of nodes allocated to the reservation",
    &["reservation_name"],
);
const CORE_COUNT: Family = Family::new(
    "slurm_reservation_core_count",
    "The number of cores allocated to the reservation",
    &["reservation_name"],
);

static FAMILIES: [Family; 5] = [INFO, START_TIME, END_TIME, NODE_COUNT, CORE_COUNT];

pub struct ReservationsCollector;

#[async_trait]
impl Collector for ReservationsCollector {
    fn name(&self) -> &'static str {
        "reservations"
    }

    fn families(&self) -> Vec<&'static Family> {
        FAMILIES.iter().collect()
    }

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64> {
        let output = runner.run("scontrol", &["show", "reservation"]).await?;
        let parsed = parse_reservations(&output);
        for r in &parsed.value {
            let name = [r.name.as_str()];
            batch.set(
                &INFO,
                &[&r.name, &r.state, &r.users, &r.nodes, &r.partition, &r.flags],
                1.0,
            )?;
            if let Some(t) = r.start_time {
                batch.set(&START_TIME, &name, t.timestamp() as f64)?;
            }
            if let Some(t) = r.end_time {
                batch.set(&END_TIME, &name, t.timestamp() as f64)?;
            }
            batch.set(&NODE_COUNT, &name, r.node_count)?;
            batch.set(&CORE_COUNT, &name, r.core_count)?;
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
    async fn test_reservations() {
        let listing = "\
ReservationName=pre-reservation-maintenance StartTime=2025-08-26T07:00:00 EndTime=2025-08-29T20:00:00 Duration=3-13:00:00
   Nodes=node[001-102] NodeCnt=102 CoreCnt=25152 Features=(null) PartitionName=(null) Flags=SPEC_NODES,ALL_NODES
   TRES=cpu=25152
   Users=user01 Groups=(null) Accounts=(null) Licenses=(null) State=INACTIVE BurstBuffer=(null)
   MaxStartDelay=(null)

ReservationName=broken StartTime=Unknown EndTime=2025-08-29T20:00:00
";
        let runner = FakeRunner::new().with("scontrol show reservation", listing);
        let mut batch = MetricBatch::new();
        let errors = ReservationsCollector.collect(&runner, &mut batch).await.unwrap();
        assert!(errors == 1);
        let families = batch.into_families();

        let info = [
            ("reservation_name", "pre-reservation-maintenance"),
            ("state", "INACTIVE"),
            ("users", "user01"),
            ("nodes", "node[001-102]"),
            ("partition", ""),
            ("flags", "SPEC_NODES,ALL_NODES"),
        ];
        assert!(sample(&families, "slurm_reservation_info", &info) == Some(1.0));

        let name = [("reservation_name", "pre-reservation-maintenance")];
        assert!(sample(&families, "slurm_reservation_start_time_seconds", &name) == Some(1756191600.0));
        assert!(sample(&families, "slurm_reservation_end_time_seconds", &name) == Some(1756497600.0));
        assert!(sample(&families, "slurm_reservation_node_count", &name) == Some(102.0));
        assert!(sample(&families, "slurm_reservation_core_count", &name) == Some(25152.0));

        // The unparsable start time is left out, the rest of the reservation is not.
        assert!(sample_count(&families, "slurm_reservation_start_time_seconds") == 1);
        assert!(sample_count(&families, "slurm_reservation_end_time_seconds") == 2);
    }
}
