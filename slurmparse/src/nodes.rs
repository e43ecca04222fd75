// Node counts by state and feature set.
//
// The per-partition listing is `count|state|features`, eg
//
//   40|allocated|feature_a,feature_b
//   10|down*|(null)
//
// A partition typically has several lines for the same state (one per feature set) and several
// states for the same feature set.  The same node can be listed in more than one partition, so
// per-partition numbers do not add up to the cluster total; the total comes from a separate listing.

use crate::fields::{number_or_zero, sorted_unique_lines};
use crate::states::NodeState;
use crate::Parsed;
use itertools::Itertools;
use std::collections::HashMap;

/// Canonical feature set → state → node count.
pub type FeatureSets = HashMap<String, HashMap<NodeState, f64>>;

/// Features are printed in configuration order, which varies between nodes.  Sort them so that
/// permutations of the same set collapse.  A node without features prints "(null)".

pub fn canonical_feature_set(raw: &str) -> String {
    let raw = raw.trim();
    if raw == "(null)" {
        return "null".to_string();
    }
    raw.split(',').map(str::trim).sorted().join(",")
}

/// Aggregate the `sinfo -h -o "%D|%T|%b" -p <partition>` listing.  Identical lines are counted once.

pub fn parse_feature_sets(input: &str) -> Parsed<FeatureSets> {
    let mut parse_errors = 0;
    let mut sets = FeatureSets::new();
    for line in sorted_unique_lines(input) {
        if !line.contains('|') {
            continue;
        }
        let fields = line.split('|').collect::<Vec<&str>>();
        if fields.len() < 3 {
            parse_errors += 1;
            continue;
        }
        let count = number_or_zero(fields[0], &mut parse_errors);
        let state = NodeState::classify(fields[1]);
        *sets
            .entry(canonical_feature_set(fields[2]))
            .or_default()
            .entry(state)
            .or_insert(0.0) += count;
    }
    Parsed::new(sets, parse_errors)
}

/// The partition names from `sinfo -h -o %R`, sorted and without duplicates.

pub fn parse_partition_names(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .sorted()
        .dedup()
        .map(|l| l.to_string())
        .collect()
}

/// `scontrol show nodes -o` prints one node per line.
pub fn count_nodes(input: &str) -> f64 {
    input.lines().filter(|l| !l.trim().is_empty()).count() as f64
}

#[cfg(test)]
fn count(sets: &FeatureSets, features: &str, state: NodeState) -> f64 {
    sets.get(features)
        .and_then(|m| m.get(&state))
        .copied()
        .unwrap_or(0.0)
}

#[test]
fn test_parse_feature_sets() {
    let p = parse_feature_sets(include_str!("../testdata/sinfo_nodes.txt"));
    assert!(p.parse_errors == 0);
    let sets = p.value;
    assert!(count(&sets, "feature_a,feature_b", NodeState::Idle) == 10.0);
    assert!(count(&sets, "feature_a,feature_b", NodeState::Down) == 10.0);
    assert!(count(&sets, "feature_a,feature_b", NodeState::Allocated) == 40.0);
    assert!(count(&sets, "feature_a", NodeState::Allocated) == 20.0);
    assert!(count(&sets, "null", NodeState::Down) == 10.0);
    assert!(count(&sets, "null", NodeState::Other) == 42.0);
    assert!(count(&sets, "feature_a", NodeState::Other) == 24.0);
    assert!(count(&sets, "feature_a", NodeState::Planned) == 3.0);
    assert!(count(&sets, "feature_b", NodeState::Planned) == 5.0);
    assert!(count(&sets, "feature_b", NodeState::Idle) == 0.0);
}

#[test]
fn test_parse_feature_sets_duplicated_input() {
    let input = include_str!("../testdata/sinfo_nodes.txt");
    let doubled = format!("{input}{input}");
    assert!(parse_feature_sets(input) == parse_feature_sets(&doubled));
}

#[test]
fn test_canonical_feature_set() {
    assert!(canonical_feature_set("b,a,c") == canonical_feature_set("c,b,a"));
    assert!(canonical_feature_set("gpu, a100") == "a100,gpu");
    assert!(canonical_feature_set("(null)") == "null");
    assert!(canonical_feature_set("") == "");
}

#[test]
fn test_parse_feature_sets_bad_lines() {
    let p = parse_feature_sets("4|idle\nx|idle|(null)\nsinfo: notice\n");
    assert!(p.parse_errors == 2);
    assert!(count(&p.value, "null", NodeState::Idle) == 0.0);
}

#[test]
fn test_parse_partition_names() {
    assert!(parse_partition_names("normal\ngpu\n\n normal \nlong\n") == vec!["gpu", "long", "normal"]);
}

#[test]
fn test_count_nodes() {
    let input = "NodeName=c1 Arch=x86_64 CoresPerSocket=32\nNodeName=c2 Arch=x86_64 CoresPerSocket=32\n\n";
    assert!(count_nodes(input) == 2.0);
    assert!(count_nodes("") == 0.0);
}
