// Per-partition CPU usage and pending jobs.

use crate::counts::CpuCounts;
use crate::fields::split_records;
use crate::Parsed;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartitionUsage {
    pub cpus: CpuCounts,
    pub pending_jobs: f64,
}

pub type Partitions = HashMap<String, PartitionUsage>;

/// Parse `sinfo -h -o %R,%C`: one `name,a/i/o/t` line per partition.

pub fn parse_partition_cpus(input: &str) -> Parsed<Partitions> {
    let mut parse_errors = 0;
    let mut partitions = Partitions::new();
    for fields in split_records(input, b',', &mut parse_errors) {
        if fields[0].is_empty() {
            parse_errors += 1;
            continue;
        }
        let cpus = CpuCounts::from_field(&fields[1], &mut parse_errors);
        partitions.entry(fields[0].clone()).or_default().cpus = cpus;
    }
    Parsed::new(partitions, parse_errors)
}

/// Add pending job counts from `squeue -a -r -h -o %P --states=PENDING`, one partition list per job.
/// A job pending in several partitions prints them comma-separated and counts once in each.  Only
/// partitions already in `partitions` are counted.

pub fn count_pending_by_partition(partitions: &mut Partitions, input: &str) {
    for line in input.lines() {
        for name in line.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if let Some(p) = partitions.get_mut(name) {
                p.pending_jobs += 1.0;
            }
        }
    }
}

#[test]
fn test_parse_partition_cpus() {
    let p = parse_partition_cpus("normal,5725/28/3599/9352\ngpu,3/13/0/16\n\n");
    assert!(p.parse_errors == 0);
    assert!(p.value.len() == 2);
    assert!(p.value["normal"].cpus.allocated == 5725.0);
    assert!(p.value["normal"].cpus.total == 9352.0);
    assert!(p.value["gpu"].cpus.idle == 13.0);
    assert!(p.value["gpu"].pending_jobs == 0.0);
}

#[test]
fn test_count_pending_by_partition() {
    let mut partitions = parse_partition_cpus("normal,1/1/0/2\ngpu,0/4/0/4\n").value;
    count_pending_by_partition(&mut partitions, "normal\nnormal\ngpu,normal\nretired\n");
    assert!(partitions["normal"].pending_jobs == 3.0);
    assert!(partitions["gpu"].pending_jobs == 1.0);
    assert!(!partitions.contains_key("retired"));
}
