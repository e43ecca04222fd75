// Per-node detail from
//
//   sinfo -h -N -O "NodeList:25,AllocMem,Memory,CPUsState,StateLong,Partition,Reason:30,UserLong,Timestamp"
//
// The columns are space padded to their widths:
//
//   0 node name
//   1 allocated memory (MB)
//   2 total memory (MB)
//   3 CPU counts, allocated/idle/other/total
//   4 state, long form ("mixed", "down*", "drained")
//   5 partition
//   6 reason, may contain single spaces
//   7 user who set the reason, eg "slurm(64030)"
//   8 time the reason was set
//
// A node appears once per partition it is in.  Sinfo prints empty trailing columns as padding, so the
// last three columns may be missing entirely after splitting.

use crate::counts::CpuCounts;
use crate::fields::{number_or_zero, sorted_unique_lines, split_padded_columns};
use crate::states::NodeState;
use crate::Parsed;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeRecord {
    pub mem_alloc: f64,
    pub mem_total: f64,
    pub cpus: CpuCounts,
    /// The state as printed, from the first line seen for the node.
    pub status: String,
    pub state: NodeState,
    /// Distinct partitions in the order seen (input order is sorted).
    pub partitions: Vec<String>,
    pub reason: String,
    pub user: String,
    pub timestamp: String,
}

impl NodeRecord {
    /// Allocated memory does not exceed total memory, and the CPU counts add up.
    pub fn is_consistent(&self) -> bool {
        self.mem_alloc <= self.mem_total && self.cpus.is_consistent()
    }
}

/// Node name → record, ordered by name.
pub type Nodes = BTreeMap<String, NodeRecord>;

/// Lines with fewer than six columns are skipped and counted as errors.  Records that fail
/// `is_consistent` are kept as they are but also counted as errors, once per node.

pub fn parse_node_details(input: &str) -> Parsed<Nodes> {
    let mut parse_errors = 0;
    let mut nodes = Nodes::new();
    for line in sorted_unique_lines(input) {
        let columns = split_padded_columns(line);
        if columns.len() < 6 {
            parse_errors += 1;
            continue;
        }
        let text = |i: usize| columns.get(i).map(|s| s.to_string()).unwrap_or_default();

        let mem_alloc = number_or_zero(columns[1], &mut parse_errors);
        let mem_total = number_or_zero(columns[2], &mut parse_errors);
        let cpus = CpuCounts::from_field(columns[3], &mut parse_errors);

        let node = nodes
            .entry(columns[0].to_string())
            .or_insert_with(|| NodeRecord {
                status: columns[4].to_string(),
                state: NodeState::classify(columns[4]),
                ..Default::default()
            });
        node.mem_alloc = mem_alloc;
        node.mem_total = mem_total;
        node.cpus = cpus;
        node.reason = text(6);
        node.user = text(7);
        node.timestamp = text(8);
        let partition = columns[5].to_string();
        if !node.partitions.contains(&partition) {
            node.partitions.push(partition);
        }
    }
    parse_errors += nodes.values().filter(|n| !n.is_consistent()).count() as u64;
    Parsed::new(nodes, parse_errors)
}

#[test]
fn test_parse_node_details() {
    let p = parse_node_details(include_str!("../testdata/sinfo_node.txt"));
    assert!(p.parse_errors == 0);
    assert!(p.value.len() == 3);

    let a048 = &p.value["a048"];
    assert!(a048.mem_alloc == 163840.0);
    assert!(a048.mem_total == 193000.0);
    assert!(a048.cpus.allocated == 16.0);
    assert!(a048.cpus.idle == 0.0);
    assert!(a048.cpus.other == 0.0);
    assert!(a048.cpus.total == 16.0);
    assert!(a048.status == "mixed");
    assert!(a048.state == NodeState::Mixed);
    assert!(a048.reason == "none");
    // Sorted input, duplicates removed.
    assert!(a048.partitions == vec!["all", "gpu", "long", "short"]);

    let b003 = &p.value["b003"];
    assert!(b003.mem_alloc == 296960.0);
    assert!(b003.mem_total == 386000.0);
    assert!(b003.status == "down");
    assert!(b003.state == NodeState::Down);
    assert!(b003.reason == "Not responding");
    assert!(b003.user == "slurm(64030)");
    assert!(b003.timestamp == "2024-02-11T09:12:44");
    assert!(b003.partitions == vec!["gpu", "long"]);
}

#[test]
fn test_parse_node_details_missing_trailing_columns() {
    let input = "c7                       0                   96000               0/0/48/48           drained             normal\n";
    let p = parse_node_details(input);
    assert!(p.parse_errors == 0);
    let c7 = &p.value["c7"];
    assert!(c7.state == NodeState::Drained);
    assert!(c7.reason == "" && c7.user == "" && c7.timestamp == "");
}

#[test]
fn test_parse_node_details_inconsistent() {
    let input = "\
c8                       4096                2048                8/0/0/8             allocated           normal
c9                       512                 2048                8/8/0/8             mixed               normal
c10    1024
";
    let p = parse_node_details(input);
    // c8 has more memory allocated than installed, c9's CPU counts do not add up, c10 is short.
    assert!(p.parse_errors == 3);
    assert!(p.value["c8"].mem_alloc == 4096.0);
    assert!(p.value.contains_key("c9"));
    assert!(!p.value.contains_key("c10"));
}
