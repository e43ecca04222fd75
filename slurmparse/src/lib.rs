// This library turns the text output of the Slurm command line tools (sinfo, squeue, sdiag, scontrol,
// sshare) into typed aggregates.  It does not run the tools and knows nothing about Prometheus; the
// caller supplies the captured stdout and maps the aggregates onto whatever it wants to publish.
//
// Every parser is total: it never fails and never panics on odd input.  Lines that do not look like
// data are skipped, and fields that look like data but do not decode are counted in the
// `parse_errors` field of the returned `Parsed` value, so the caller can expose them.
//
// TODO (normal pri)
//
//  - The node detail parser relies on sinfo padding columns with at least two spaces.  A column
//    value that fills its whole width will merge with its neighbour.  Widening the format in the
//    caller is the current workaround.

mod accounts;
mod counts;
mod dates;
mod fairshare;
mod fields;
mod gpus;
mod info;
mod jobs;
mod node;
mod nodes;
mod partitions;
mod queue;
mod reservations;
mod scheduler;
mod states;

// Cluster-wide `allocated/idle/other/total` CPU counts, from `sinfo -h -o %C`.

pub use counts::{parse_cpu_counts, CpuCounts};

// Job counts per account or per user, from `squeue -a -r -h -o "%A|%a|%T|%C"` (or `%u` for users).

pub use accounts::{parse_owner_jobs, JobCounts, OwnerJobs};

// Job and core counts per state, user, partition and (for pending jobs) reason, from
// `squeue -h -o "%P,%T,%C,%r,%u"`.

pub use queue::{parse_queue, Queue, QueueCounts, QueueKey};

// Individual jobs, from `squeue -h -o "%P|%T|%C|%i|%j|%r|%u"`.

pub use jobs::{parse_jobs, JobRecord, Jobs};

// Node counts per state and feature set for one partition, from `sinfo -h -o "%D|%T|%b" -p <part>`,
// and the partition list and node total that drive it.

pub use nodes::{canonical_feature_set, count_nodes, parse_feature_sets, parse_partition_names, FeatureSets};

// Per-node memory, CPU and state detail, from `sinfo -h -N -O ...`.

pub use node::{parse_node_details, NodeRecord, Nodes};

// The scheduler diagnostics report printed by `sdiag`.

pub use scheduler::{parse_scheduler_diagnostics, RpcStats, SchedulerDiagnostics};

// Reservations, from `scontrol show reservation`.

pub use reservations::{parse_reservations, Reservation};

// GPU totals from the `Gres`/`GresUsed` columns of three sinfo listings.

pub use gpus::{parse_allocated_gpus, parse_gres_count, parse_idle_gpus, parse_total_gpus, GpuCounts};

// CPU state and pending job counts per partition.

pub use partitions::{count_pending_by_partition, parse_partition_cpus, PartitionUsage, Partitions};

// Fair-share factor per account, from `sshare -n -P -o account,fairshare`.

pub use fairshare::parse_fairshare;

// Version strings from `<tool> --version`.

pub use info::parse_version;

// State vocabularies shared by the job and node parsers.

pub use states::{JobState, NodeState};

// Timestamps as Slurm prints them.

pub use dates::parse_slurm_time;

// The zero-default number parser, for callers that do their own light parsing.

pub use fields::number_or_zero;

/// The result of a parse: the aggregate, plus the number of fields that looked like data but could
/// not be decoded.  A nonzero `parse_errors` does not mean the value is unusable, only that some
/// inputs were replaced by zero or skipped.

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub parse_errors: u64,
}

impl<T> Parsed<T> {
    pub fn new(value: T, parse_errors: u64) -> Parsed<T> {
        Parsed { value, parse_errors }
    }
}
