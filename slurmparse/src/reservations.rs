// Reservations, from `scontrol show reservation`.  Each reservation is a block of `Key=Value` pairs
// spread over several indented lines; blocks are separated by a blank line.  Values never contain
// spaces (lists are comma-separated), but some contain `=`, eg `TRES=cpu=256,gres/gpu=16`.

use crate::dates::parse_slurm_time;
use crate::fields::number_or_zero;
use crate::Parsed;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reservation {
    pub name: String,
    pub state: String,
    pub users: String,
    pub nodes: String,
    /// Empty when the reservation is not tied to a partition.
    pub partition: String,
    pub flags: String,
    pub node_count: f64,
    pub core_count: f64,
    /// None if the field was missing or not in the expected layout.
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

static BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)=([^ \n]+)").unwrap());

/// Blocks without a ReservationName (such as the "No reservations in the system" notice) are
/// skipped.  Unparsable counts and times are errors.

pub fn parse_reservations(input: &str) -> Parsed<Vec<Reservation>> {
    let mut parse_errors = 0;
    let mut reservations = vec![];
    for block in BLOCK_SEPARATOR.split(input) {
        if block.trim().is_empty() {
            continue;
        }
        let mut r = Reservation::default();
        let mut named = false;
        for caps in PAIR.captures_iter(block) {
            let value = &caps[2];
            match &caps[1] {
                "ReservationName" => {
                    r.name = value.to_string();
                    named = true;
                }
                "State" => r.state = value.to_string(),
                "Users" => r.users = value.to_string(),
                "Nodes" => r.nodes = value.to_string(),
                "PartitionName" => {
                    r.partition = if value == "(null)" { String::new() } else { value.to_string() }
                }
                "Flags" => r.flags = value.to_string(),
                "NodeCnt" => r.node_count = number_or_zero(value, &mut parse_errors),
                "CoreCnt" => r.core_count = number_or_zero(value, &mut parse_errors),
                "StartTime" => r.start_time = time_or_none(value, &mut parse_errors),
                "EndTime" => r.end_time = time_or_none(value, &mut parse_errors),
                _ => {}
            }
        }
        if named {
            reservations.push(r);
        }
    }
    Parsed::new(reservations, parse_errors)
}

fn time_or_none(value: &str, parse_errors: &mut u64) -> Option<DateTime<Utc>> {
    match parse_slurm_time(value) {
        Ok(t) => Some(t),
        Err(_) => {
            *parse_errors += 1;
            None
        }
    }
}

#[test]
fn test_parse_reservations() {
    let p = parse_reservations(include_str!("../testdata/reservations.txt"));
    assert!(p.parse_errors == 0);
    assert!(p.value.len() == 2);

    let r = &p.value[0];
    assert!(r.name == "pre-reservation-maintenance");
    assert!(r.state == "INACTIVE");
    assert!(r.users == "user01");
    assert!(r.nodes == "node[001-102]");
    assert!(r.partition == "");
    assert!(r.flags == "SPEC_NODES,ALL_NODES");
    assert!(r.node_count == 102.0);
    assert!(r.core_count == 25152.0);
    assert!(r.start_time.unwrap().timestamp() == 1756191600);
    assert!(r.end_time.unwrap().timestamp() == 1756497600);

    let r = &p.value[1];
    assert!(r.name == "gpu-course");
    assert!(r.partition == "gpu");
    assert!(r.users == "alice,bob");
    assert!(r.state == "ACTIVE");
    assert!(r.start_time.unwrap().timestamp() == 1755676800);
}

#[test]
fn test_parse_reservations_none() {
    let p = parse_reservations("No reservations in the system\n");
    assert!(p.parse_errors == 0);
    assert!(p.value.is_empty());
    assert!(parse_reservations("").value.is_empty());
}

#[test]
fn test_parse_reservations_bad_time() {
    let input = "ReservationName=r1 StartTime=Unknown EndTime=2025-01-01T00:00:00 NodeCnt=two\n";
    let p = parse_reservations(input);
    assert!(p.parse_errors == 2);
    assert!(p.value[0].start_time.is_none());
    assert!(p.value[0].end_time.is_some());
    assert!(p.value[0].node_count == 0.0);
}
