// Job counts per owner.  The input is one job per line, `id|owner|state|cpus`, where the owner is the
// account (`%a`) or the user (`%u`) depending on how squeue was invoked.  Both listings decode the
// same way.

use crate::fields::{number_or_zero, split_records};
use crate::states::JobState;
use crate::Parsed;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JobCounts {
    pub pending: f64,
    pub running: f64,
    /// Sum of the CPU counts of the running jobs.
    pub running_cpus: f64,
    pub suspended: f64,
    /// Jobs in any other state.
    pub other: f64,
}

impl JobCounts {
    pub fn jobs(&self) -> f64 {
        self.pending + self.running + self.suspended + self.other
    }
}

pub type OwnerJobs = HashMap<String, JobCounts>;

pub fn parse_owner_jobs(input: &str) -> Parsed<OwnerJobs> {
    let mut parse_errors = 0;
    let mut owners = OwnerJobs::new();
    for fields in split_records(input, b'|', &mut parse_errors) {
        if fields.len() < 4 {
            parse_errors += 1;
            continue;
        }
        let counts = owners.entry(fields[1].clone()).or_default();
        match JobState::classify(&fields[2]) {
            Some(JobState::Pending) => counts.pending += 1.0,
            Some(JobState::Running) => {
                counts.running += 1.0;
                counts.running_cpus += number_or_zero(&fields[3], &mut parse_errors);
            }
            Some(JobState::Suspended) => counts.suspended += 1.0,
            _ => counts.other += 1.0,
        }
    }
    Parsed::new(owners, parse_errors)
}

#[test]
fn test_parse_owner_jobs() {
    let input = "\
11190|physics|RUNNING|32
11191|physics|RUNNING|16
11192|physics|PENDING|64
11193|chem|SUSPENDED|8
11194|chem|COMPLETING|8
11195|chem|pending|4
";
    let p = parse_owner_jobs(input);
    assert!(p.parse_errors == 0);
    assert!(p.value.len() == 2);

    let physics = &p.value["physics"];
    assert!(physics.running == 2.0);
    assert!(physics.running_cpus == 48.0);
    assert!(physics.pending == 1.0);
    assert!(physics.suspended == 0.0);

    let chem = &p.value["chem"];
    assert!(chem.suspended == 1.0);
    assert!(chem.pending == 1.0);
    assert!(chem.other == 1.0);
    assert!(chem.running_cpus == 0.0);
    assert!(chem.jobs() == 3.0);
}

#[test]
fn test_parse_owner_jobs_bad_lines() {
    let input = "\
squeue: error: some transient problem

1|alice|RUNNING|x
2|bob
3|bob|RUNNING|2
";
    let p = parse_owner_jobs(input);
    // The short record and the bad cpu count.
    assert!(p.parse_errors == 2);
    assert!(p.value["alice"].running == 1.0);
    assert!(p.value["alice"].running_cpus == 0.0);
    assert!(p.value["bob"].running_cpus == 2.0);
    assert!(!p.value.contains_key("squeue: error: some transient problem"));
}

#[test]
fn test_parse_owner_jobs_bucket_sum() {
    let input = "\
1|alice|running_something|4
2|alice|Pending_x|1
3|bob|SUSPENDED|2
4|bob|COMPLETED|2
5|carol|BOOT_FAIL|1
6|carol|REQUEUED|1
7|dave
";
    let p = parse_owner_jobs(input);
    assert!(p.parse_errors == 1);
    assert!(p.value["alice"].running == 1.0);
    assert!(p.value["alice"].running_cpus == 4.0);
    assert!(p.value["alice"].pending == 1.0);
    assert!(p.value["carol"].other == 2.0);
    let total: f64 = p.value.values().map(|c| c.jobs()).sum();
    assert!(total == 6.0);
}

#[test]
fn test_parse_owner_jobs_empty() {
    assert!(parse_owner_jobs("").value.is_empty());
}
