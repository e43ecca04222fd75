// Queue breakdown.  The input is one job per line, `partition,state,cpus,reason,user`.  The reason is
// free text and can contain commas ("(ReqNodeNotAvail, UnavailableNodes:c[1-4])"), so it is taken to
// be the raw text between the third field and the last one, exactly as squeue printed it.
//
// squeue prints `%P` of a job that is pending in several partitions as "gpu,long", which shifts the
// columns of that line.  The state column then holds a partition name and the job ends up in
// `unclassified`.

use crate::fields::{number_or_zero, split_around};
use crate::states::JobState;
use crate::Parsed;
use std::collections::HashMap;

/// The grouping key.  The reason is only recorded for pending jobs; for other states it is None.

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey {
    pub user: String,
    pub partition: String,
    pub reason: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueueCounts {
    pub jobs: f64,
    pub cores: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Queue {
    pub states: HashMap<JobState, HashMap<QueueKey, QueueCounts>>,

    /// Well-formed lines whose state is outside the `JobState` vocabulary.
    pub unclassified: f64,
}

impl Queue {
    pub fn get(&self, state: JobState, key: &QueueKey) -> Option<&QueueCounts> {
        self.states.get(&state).and_then(|m| m.get(key))
    }
}

pub fn parse_queue(input: &str) -> Parsed<Queue> {
    let mut parse_errors = 0;
    let mut queue = Queue::default();
    for line in input.lines() {
        if !line.contains(',') {
            continue;
        }
        let Some(record) = split_around(line, ',', 3, 1) else {
            parse_errors += 1;
            continue;
        };
        let (partition, state, cpus) = (record.head[0], record.head[1], record.head[2]);
        let state = match JobState::classify(state) {
            Some(state) => state,
            None => {
                queue.unclassified += 1.0;
                continue;
            }
        };
        let key = QueueKey {
            user: record.tail[0].to_string(),
            partition: partition.to_string(),
            reason: if state == JobState::Pending {
                Some(record.middle.to_string())
            } else {
                None
            },
        };
        let cores = number_or_zero(cpus, &mut parse_errors);
        let counts = queue.states.entry(state).or_default().entry(key).or_default();
        counts.jobs += 1.0;
        counts.cores += cores;
    }
    Parsed::new(queue, parse_errors)
}

#[cfg(test)]
fn key(user: &str, partition: &str, reason: Option<&str>) -> QueueKey {
    QueueKey {
        user: user.to_string(),
        partition: partition.to_string(),
        reason: reason.map(|r| r.to_string()),
    }
}

#[test]
fn test_parse_queue() {
    let input = "\
normal,RUNNING,32,None,alice
normal,RUNNING,16,None,alice
gpu,PENDING,8,Resources,alice
gpu,PENDING,8,Priority,alice
gpu,PENDING,4,Priority,alice
normal,SUSPENDED,12,None,bob
normal,COMPLETING,2,None,bob
normal,REQUEUED,2,None,bob
";
    let p = parse_queue(input);
    assert!(p.parse_errors == 0);
    let q = p.value;

    let running = q.get(JobState::Running, &key("alice", "normal", None)).unwrap();
    assert!(running.jobs == 2.0 && running.cores == 48.0);

    let priority = q.get(JobState::Pending, &key("alice", "gpu", Some("Priority"))).unwrap();
    assert!(priority.jobs == 2.0 && priority.cores == 12.0);
    let resources = q.get(JobState::Pending, &key("alice", "gpu", Some("Resources"))).unwrap();
    assert!(resources.jobs == 1.0 && resources.cores == 8.0);

    // Suspended cores go to the core count, not the job count.
    let suspended = q.get(JobState::Suspended, &key("bob", "normal", None)).unwrap();
    assert!(suspended.jobs == 1.0 && suspended.cores == 12.0);

    assert!(q.get(JobState::Completing, &key("bob", "normal", None)).unwrap().jobs == 1.0);
    assert!(q.unclassified == 1.0);
}

#[test]
fn test_parse_queue_reason_with_commas() {
    let input = "long,PENDING,64,(ReqNodeNotAvail, UnavailableNodes:c[1-4]),carol\n";
    let p = parse_queue(input);
    assert!(p.parse_errors == 0);
    let reason = "(ReqNodeNotAvail, UnavailableNodes:c[1-4])";
    let pending = p.value.get(JobState::Pending, &key("carol", "long", Some(reason))).unwrap();
    assert!(pending.jobs == 1.0 && pending.cores == 64.0);
}

#[test]
fn test_parse_queue_short_lines() {
    let p = parse_queue("long,RUNNING,4\n\nlong,RUNNING,x,None,dave\n");
    assert!(p.parse_errors == 2);
    let running = p.value.get(JobState::Running, &key("dave", "long", None)).unwrap();
    assert!(running.jobs == 1.0 && running.cores == 0.0);
}

#[test]
fn test_parse_queue_multiple_partitions() {
    let p = parse_queue("gpu,long,PENDING,8,Priority,frank\nlong,PENDING,8,Priority,frank\n");
    assert!(p.value.unclassified == 1.0);
    let pending = p.value.get(JobState::Pending, &key("frank", "long", Some("Priority"))).unwrap();
    assert!(pending.jobs == 1.0);
}
