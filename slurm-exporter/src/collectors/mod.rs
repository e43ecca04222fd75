// One collector per group of metric families.  A collector runs the commands it needs, hands the
// output to the parsers in `slurmparse`, and writes samples into the batch it is given.  It returns
// the number of parse anomalies it saw; a command failure is returned as an error and discards the
// whole batch.

mod accounts;
mod cpus;
mod fairshare;
mod gpus;
mod info;
mod jobs;
mod node;
mod nodes;
mod partitions;
mod queue;
mod reservations;
mod scheduler;

use crate::metrics::{Family, MetricBatch};
use crate::runner::CommandRunner;
use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;

#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every family the collector may emit.
    fn families(&self) -> Vec<&'static Family>;

    async fn collect(&self, runner: &dyn CommandRunner, batch: &mut MetricBatch) -> Result<u64>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum CollectorName {
    Accounts,
    Cpus,
    Fairshare,
    Gpus,
    Info,
    Jobs,
    Node,
    Nodes,
    Partitions,
    Queue,
    Reservations,
    Scheduler,
    Users,
}

impl CollectorName {
    pub fn all() -> &'static [CollectorName] {
        CollectorName::value_variants()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CollectorName::Accounts => "accounts",
            CollectorName::Cpus => "cpus",
            CollectorName::Fairshare => "fairshare",
            CollectorName::Gpus => "gpus",
            CollectorName::Info => "info",
            CollectorName::Jobs => "jobs",
            CollectorName::Node => "node",
            CollectorName::Nodes => "nodes",
            CollectorName::Partitions => "partitions",
            CollectorName::Queue => "queue",
            CollectorName::Reservations => "reservations",
            CollectorName::Scheduler => "scheduler",
            CollectorName::Users => "users",
        }
    }

    pub fn build(self) -> Box<dyn Collector> {
        match self {
            CollectorName::Accounts => Box::new(accounts::OwnerJobsCollector::accounts()),
            CollectorName::Cpus => Box::new(cpus::CpusCollector),
            CollectorName::Fairshare => Box::new(fairshare::FairshareCollector),
            CollectorName::Gpus => Box::new(gpus::GpusCollector),
            CollectorName::Info => Box::new(info::InfoCollector),
            CollectorName::Jobs => Box::new(jobs::JobsCollector),
            CollectorName::Node => Box::new(node::NodeCollector),
            CollectorName::Nodes => Box::new(nodes::NodesCollector),
            CollectorName::Partitions => Box::new(partitions::PartitionsCollector),
            CollectorName::Queue => Box::new(queue::QueueCollector),
            CollectorName::Reservations => Box::new(reservations::ReservationsCollector),
            CollectorName::Scheduler => Box::new(scheduler::SchedulerCollector),
            CollectorName::Users => Box::new(accounts::OwnerJobsCollector::users()),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use crate::runner::{CommandRunner, ExecError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io;
    use std::time::Duration;

    enum Canned {
        Output(String),
        Timeout,
    }

    /// A runner that answers from a table keyed by the full command line.  Unknown commands fail
    /// as if the program was not installed.
    #[derive(Default)]
    pub struct FakeRunner {
        answers: HashMap<String, Canned>,
    }

    impl FakeRunner {
        pub fn new() -> FakeRunner {
            FakeRunner::default()
        }

        pub fn with(mut self, cmdline: &str, output: &str) -> FakeRunner {
            self.answers.insert(cmdline.to_string(), Canned::Output(output.to_string()));
            self
        }

        pub fn timing_out(mut self, cmdline: &str) -> FakeRunner {
            self.answers.insert(cmdline.to_string(), Canned::Timeout);
            self
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecError> {
            let cmdline = if args.is_empty() {
                program.to_string()
            } else {
                format!("{} {}", program, args.join(" "))
            };
            match self.answers.get(&cmdline) {
                Some(Canned::Output(s)) => Ok(s.clone()),
                Some(Canned::Timeout) => Err(ExecError::Timeout {
                    program: program.to_string(),
                    timeout: Duration::from_secs(5),
                }),
                None => Err(ExecError::Spawn {
                    program: program.to_string(),
                    source: io::Error::new(io::ErrorKind::NotFound, format!("no answer for `{cmdline}`")),
                }),
            }
        }
    }
}

#[test]
fn test_names_are_unique_and_stable() {
    let mut names = CollectorName::all().iter().map(|c| c.as_str()).collect::<Vec<_>>();
    names.sort();
    names.dedup();
    assert!(names.len() == CollectorName::all().len());
    for c in CollectorName::all() {
        assert!(c.build().name() == c.as_str());
        assert!(CollectorName::from_str(c.as_str(), false) == Ok(*c));
    }
}

#[test]
fn test_families_are_disjoint() {
    let mut seen = std::collections::HashSet::new();
    for c in CollectorName::all() {
        for f in c.build().families() {
            assert!(seen.insert(f.name), "{} emitted by more than one collector", f.name);
        }
    }
}
