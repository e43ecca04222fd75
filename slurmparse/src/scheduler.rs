// Parser for the report printed by `sdiag`.
//
// The report is a sequence of sections.  Most lines are `key: value`, but the keys are not unique:
// "Last cycle" and "Mean cycle" appear first under the main scheduler heading and then again under
// the backfill heading, and nothing on the line itself says which is which.  We therefore count
// occurrences in document order.
//
// The two RPC tables at the end have their own line format:
//
//   REQUEST_PARTITION_INFO    ( 2009) count:468871 ave_time:102    total_time:47871645
//   root                      (    0) count:1076939 ave_time:86    total_time:93007287
//
// and are introduced by "Remote Procedure Call statistics by message type" and "... by user".
// Later Slurm versions add a "Pending RPC statistics" table, which we skip.

use crate::fields::number_or_zero;
use crate::Parsed;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RpcStats {
    pub count: f64,
    pub ave_time: f64,
    pub total_time: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchedulerDiagnostics {
    pub threads: f64,
    pub queue_size: f64,
    pub dbd_queue_size: f64,
    pub last_cycle: f64,
    pub mean_cycle: f64,
    pub cycles_per_minute: f64,
    pub backfill_last_cycle: f64,
    pub backfill_mean_cycle: f64,
    pub backfill_depth_mean: f64,
    pub backfilled_jobs_since_start: f64,
    pub backfilled_jobs_since_cycle: f64,
    pub backfilled_heterogeneous: f64,
    pub rpc_by_operation: HashMap<String, RpcStats>,
    pub rpc_by_user: HashMap<String, RpcStats>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    General,
    RpcByMessageType,
    RpcByUser,
    OtherRpc,
}

#[derive(Clone, Copy, Debug)]
enum Key {
    Threads,
    QueueSize,
    DbdQueueSize,
    LastCycle,
    MeanCycle,
    CyclesPerMinute,
    DepthMean,
    BackfilledSinceStart,
    BackfilledSinceCycle,
    BackfilledHeterogeneous,
}

// Matched against the part of the line before the first colon.
static KEYS: Lazy<Vec<(Regex, Key)>> = Lazy::new(|| {
    [
        (r"^Server thread", Key::Threads),
        (r"^Agent queue", Key::QueueSize),
        (r"^DBD Agent", Key::DbdQueueSize),
        (r"^\s+Last cycle$", Key::LastCycle),
        (r"^\s+Mean cycle$", Key::MeanCycle),
        (r"^\s+Cycles per", Key::CyclesPerMinute),
        (r"^\s+Depth Mean$", Key::DepthMean),
        (r"^\s+Total backfilled jobs \(since last slurm start\)", Key::BackfilledSinceStart),
        (r"^\s+Total backfilled jobs \(since last stats cycle start\)", Key::BackfilledSinceCycle),
        (r"^\s+Total backfilled heterogeneous job components", Key::BackfilledHeterogeneous),
    ]
    .into_iter()
    .map(|(re, key)| (Regex::new(re).unwrap(), key))
    .collect()
});

static RPC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+)\s+\(.*count:([0-9]*)\s*ave_time:([0-9]*)\s\s*total_time:([0-9]*)\s*$")
        .unwrap()
});

/// How many times each ambiguous key has been seen so far.
#[derive(Default)]
struct Occurrences {
    last_cycle: usize,
    mean_cycle: usize,
}

struct Parser {
    diag: SchedulerDiagnostics,
    section: Section,
    seen: Occurrences,
    parse_errors: u64,
}

impl Parser {
    fn line(&mut self, line: &str) {
        if let Some(section) = section_header(line) {
            self.section = section;
            return;
        }
        match self.section {
            Section::RpcByMessageType | Section::RpcByUser => {
                if let Some(caps) = RPC_LINE.captures(line) {
                    let stats = RpcStats {
                        count: number_or_zero(&caps[2], &mut self.parse_errors),
                        ave_time: number_or_zero(&caps[3], &mut self.parse_errors),
                        total_time: number_or_zero(&caps[4], &mut self.parse_errors),
                    };
                    let table = if self.section == Section::RpcByUser {
                        &mut self.diag.rpc_by_user
                    } else {
                        &mut self.diag.rpc_by_operation
                    };
                    table.insert(caps[1].to_string(), stats);
                }
            }
            Section::OtherRpc => {}
            Section::General => self.key_value(line),
        }
    }

    fn key_value(&mut self, line: &str) {
        let (key, value) = match line.split_once(':') {
            Some(kv) => kv,
            None => return,
        };
        let key = match KEYS.iter().find(|(re, _)| re.is_match(key)) {
            Some((_, key)) => *key,
            None => return,
        };
        let value = number_or_zero(value, &mut self.parse_errors);
        let d = &mut self.diag;
        match key {
            Key::Threads => d.threads = value,
            Key::QueueSize => d.queue_size = value,
            Key::DbdQueueSize => d.dbd_queue_size = value,
            Key::LastCycle => {
                self.seen.last_cycle += 1;
                if self.seen.last_cycle == 1 {
                    d.last_cycle = value
                } else {
                    d.backfill_last_cycle = value
                }
            }
            Key::MeanCycle => {
                self.seen.mean_cycle += 1;
                if self.seen.mean_cycle == 1 {
                    d.mean_cycle = value
                } else {
                    d.backfill_mean_cycle = value
                }
            }
            Key::CyclesPerMinute => d.cycles_per_minute = value,
            Key::DepthMean => d.backfill_depth_mean = value,
            Key::BackfilledSinceStart => d.backfilled_jobs_since_start = value,
            Key::BackfilledSinceCycle => d.backfilled_jobs_since_cycle = value,
            Key::BackfilledHeterogeneous => d.backfilled_heterogeneous = value,
        }
    }
}

fn section_header(line: &str) -> Option<Section> {
    if line.contains("statistics by message type") {
        Some(Section::RpcByMessageType)
    } else if line.contains("statistics by user") {
        Some(Section::RpcByUser)
    } else if line.contains("RPC statistics") {
        Some(Section::OtherRpc)
    } else {
        None
    }
}

pub fn parse_scheduler_diagnostics(input: &str) -> Parsed<SchedulerDiagnostics> {
    let mut p = Parser {
        diag: SchedulerDiagnostics::default(),
        section: Section::General,
        seen: Occurrences::default(),
        parse_errors: 0,
    };
    for line in input.lines() {
        p.line(line);
    }
    Parsed::new(p.diag, p.parse_errors)
}

#[test]
fn test_parse_scheduler_diagnostics() {
    let p = parse_scheduler_diagnostics(include_str!("../testdata/sdiag.txt"));
    assert!(p.parse_errors == 0);
    let d = p.value;
    assert!(d.threads == 3.0);
    assert!(d.queue_size == 0.0);
    assert!(d.dbd_queue_size == 0.0);
    assert!(d.last_cycle == 97209.0);
    assert!(d.mean_cycle == 23514.0);
    assert!(d.cycles_per_minute == 4.0);
    assert!(d.backfill_last_cycle == 1942890.0);
    assert!(d.backfill_mean_cycle == 1457390.0);
    assert!(d.backfill_depth_mean == 15721.0);
    assert!(d.backfilled_jobs_since_start == 111544.0);
    assert!(d.backfilled_jobs_since_cycle == 793.0);
    assert!(d.backfilled_heterogeneous == 10.0);

    assert!(d.rpc_by_operation.len() == 4);
    assert!(
        d.rpc_by_operation["REQUEST_PARTITION_INFO"]
            == RpcStats {
                count: 468871.0,
                ave_time: 102.0,
                total_time: 47871645.0
            }
    );
    assert!(d.rpc_by_operation["MESSAGE_EPILOG_COMPLETE"].ave_time == 1622.0);

    assert!(d.rpc_by_user.len() == 3);
    assert!(d.rpc_by_user["root"].count == 1076939.0);
    assert!(d.rpc_by_user["alice"].total_time == 253181.0);
}

#[test]
fn test_rpc_names_with_punctuation() {
    let input = "\
Remote Procedure Call statistics by user
\tjohn.doe        (   10001) count:7 ave_time:3      total_time:21
\tjohn.smith      (   10002) count:5 ave_time:2      total_time:10
\tsvc-batch       (   10003) count:1 ave_time:9      total_time:9
";
    let d = parse_scheduler_diagnostics(input).value;
    assert!(d.rpc_by_user.len() == 3);
    assert!(d.rpc_by_user["john.doe"].count == 7.0);
    assert!(d.rpc_by_user["john.smith"].total_time == 10.0);
    assert!(d.rpc_by_user["svc-batch"].ave_time == 9.0);
}

#[test]
fn test_cycle_order_decides_scheduler() {
    // Same keys, no headings: the first occurrence is the main scheduler.
    let input = "\tLast cycle: 10\n\tMean cycle: 20\n\tLast cycle: 30\n\tMean cycle: 40\n";
    let d = parse_scheduler_diagnostics(input).value;
    assert!(d.last_cycle == 10.0);
    assert!(d.mean_cycle == 20.0);
    assert!(d.backfill_last_cycle == 30.0);
    assert!(d.backfill_mean_cycle == 40.0);
}

#[test]
fn test_rpc_tables_do_not_leak() {
    let input = "\
Remote Procedure Call statistics by user
\troot            (       0) count:10 ave_time:5      total_time:50
Pending RPC statistics
\tREQUEST_TERMINATE_JOB ( 6011) count:3 ave_time:1      total_time:3
";
    let d = parse_scheduler_diagnostics(input).value;
    assert!(d.rpc_by_user.len() == 1);
    assert!(d.rpc_by_operation.is_empty());
}

#[test]
fn test_parse_scheduler_diagnostics_bad_value() {
    let p = parse_scheduler_diagnostics("Server thread count: many\nAgent queue size: 7\n");
    assert!(p.parse_errors == 1);
    assert!(p.value.threads == 0.0);
    assert!(p.value.queue_size == 7.0);
}
