// `allocated/idle/other/total` CPU counts, the format of sinfo's `%C` and of the `CPUsState` column.

use crate::fields::number_or_zero;
use crate::Parsed;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CpuCounts {
    pub allocated: f64,
    pub idle: f64,
    pub other: f64,
    pub total: f64,
}

impl CpuCounts {
    /// Decode one `a/i/o/t` field.  A field without a `/` is not a count field and yields zeros
    /// silently; a field with the wrong number of components, or a component that is not a number,
    /// is a parse error.

    pub fn from_field(field: &str, parse_errors: &mut u64) -> CpuCounts {
        let field = field.trim();
        if !field.contains('/') {
            return CpuCounts::default();
        }
        let parts = field.split('/').collect::<Vec<&str>>();
        if parts.len() != 4 {
            *parse_errors += 1;
        }
        let part = |i: usize| parts.get(i).copied().unwrap_or("");
        CpuCounts {
            allocated: number_or_zero(part(0), parse_errors),
            idle: number_or_zero(part(1), parse_errors),
            other: number_or_zero(part(2), parse_errors),
            total: number_or_zero(part(3), parse_errors),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.allocated + self.idle + self.other == self.total
    }
}

/// Parse the cluster-wide count printed by `sinfo -h -o %C`.  Only the first non-blank line is
/// considered; with no such line the counts are zero.

pub fn parse_cpu_counts(input: &str) -> Parsed<CpuCounts> {
    let mut parse_errors = 0;
    let counts = match input.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => CpuCounts::from_field(line, &mut parse_errors),
        None => CpuCounts::default(),
    };
    Parsed::new(counts, parse_errors)
}

#[test]
fn test_parse_cpu_counts() {
    let p = parse_cpu_counts("5725/28/3599/9352\n");
    assert!(p.parse_errors == 0);
    assert!(p.value.allocated == 5725.0);
    assert!(p.value.idle == 28.0);
    assert!(p.value.other == 3599.0);
    assert!(p.value.total == 9352.0);
    assert!(p.value.is_consistent());
}

#[test]
fn test_parse_cpu_counts_degenerate() {
    assert!(parse_cpu_counts("") == Parsed::new(CpuCounts::default(), 0));
    assert!(parse_cpu_counts("slurm_load_partitions: Unable to contact slurm controller\n").value == CpuCounts::default());

    let p = parse_cpu_counts("1/2/3");
    assert!(p.parse_errors == 1);
    assert!(p.value.allocated == 1.0 && p.value.total == 0.0);

    let p = parse_cpu_counts("1/x/0/1");
    assert!(p.parse_errors == 1);
    assert!(p.value.idle == 0.0 && p.value.total == 1.0);
}
