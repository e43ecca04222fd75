// Individual jobs.  The input is `partition|state|cpus|id|name|reason|user`, one line per job and
// partition.  Job names are user-chosen and may contain `|`, so the first four and the last two
// fields are positional and the name is the raw text left in the middle.

use crate::fields::{number_or_zero, split_around};
use crate::Parsed;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobRecord {
    pub cpus: f64,
    pub name: String,
    /// As printed by squeue, eg "RUNNING".
    pub status: String,
    pub reason: String,
    pub user: String,
    /// Distinct partitions in first-seen order.
    pub partitions: Vec<String>,
}

/// Job id → record.
pub type Jobs = HashMap<String, JobRecord>;

pub fn parse_jobs(input: &str) -> Parsed<Jobs> {
    let mut parse_errors = 0;
    let mut jobs = Jobs::new();
    for line in input.lines() {
        if !line.contains('|') {
            continue;
        }
        let Some(record) = split_around(line, '|', 4, 2) else {
            parse_errors += 1;
            continue;
        };
        let (partition, status, id) = (record.head[0], record.head[1], record.head[3]);
        let cpus = number_or_zero(record.head[2], &mut parse_errors);
        let job = jobs.entry(id.to_string()).or_default();
        job.cpus = cpus;
        job.status = status.to_string();
        job.name = record.middle.to_string();
        job.reason = record.tail[0].to_string();
        job.user = record.tail[1].to_string();
        if !job.partitions.iter().any(|p| p == partition) {
            job.partitions.push(partition.to_string());
        }
    }
    Parsed::new(jobs, parse_errors)
}

#[test]
fn test_parse_jobs() {
    let input = "\
normal|RUNNING|32|4711|train-model|None|alice
gpu|PENDING|8|4712|sweep|Priority|bob
long|PENDING|8|4712|sweep|Priority|bob
gpu|PENDING|8|4712|sweep|Priority|bob
";
    let p = parse_jobs(input);
    assert!(p.parse_errors == 0);
    assert!(p.value.len() == 2);

    let j = &p.value["4711"];
    assert!(j.cpus == 32.0);
    assert!(j.name == "train-model");
    assert!(j.status == "RUNNING");
    assert!(j.reason == "None");
    assert!(j.user == "alice");
    assert!(j.partitions == vec!["normal"]);

    let j = &p.value["4712"];
    assert!(j.partitions == vec!["gpu", "long"]);
}

#[test]
fn test_parse_jobs_name_with_delimiter() {
    let p = parse_jobs("normal|RUNNING|4|99|a|b|c|None|erin\n");
    assert!(p.parse_errors == 0);
    assert!(p.value["99"].name == "a|b|c");
    assert!(p.value["99"].user == "erin");
}

#[test]
fn test_parse_jobs_name_keeps_spacing() {
    let p = parse_jobs("normal|RUNNING|4|99|my job | v2|None|erin\n");
    assert!(p.parse_errors == 0);
    assert!(p.value["99"].name == "my job | v2");
    assert!(p.value["99"].reason == "None");
}

#[test]
fn test_parse_jobs_short_line() {
    let p = parse_jobs("normal|RUNNING|4|99|x|None\n");
    assert!(p.parse_errors == 1);
    assert!(p.value.is_empty());
}
