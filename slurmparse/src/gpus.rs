// GPU counts from the generic resource (gres) columns of sinfo.
//
// A gres column is a comma-separated list of resources.  GPU entries look like
//
//   gpu:4                 untyped
//   gpu:a100:4            typed
//   gpu:(null):4          typed, no type name configured
//   gpu:a100:4(S:0-1)     with socket affinity
//   gpu:a100:2(IDX:0-1)   GresUsed, with the indices in use
//
// and other resources (mps:400, shard:8) are ignored.  Each listing line starts with the number of
// nodes that share the rest of the line.

use crate::fields::number_or_zero;
use crate::Parsed;
use once_cell::sync::Lazy;
use regex::Regex;

// Annotations directly follow the count.  The `(null)` type name does not follow a digit.
static ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9])\([^)]*\)").unwrap());
// The type name, when present, is always followed by the count.
static GPU_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^gpu:(?:(\(null\)|[^:(]+):)?([0-9]+)$").unwrap());

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GpuCounts {
    pub allocated: f64,
    pub idle: f64,
    pub other: f64,
    pub total: f64,
    /// allocated / total, zero when there are no GPUs.
    pub utilization: f64,
}

impl GpuCounts {
    pub fn derive(total: f64, allocated: f64, idle: f64) -> GpuCounts {
        GpuCounts {
            allocated,
            idle,
            other: total - allocated - idle,
            total,
            utilization: if total > 0.0 { allocated / total } else { 0.0 },
        }
    }
}

/// The number of GPUs in one gres column value.

pub fn parse_gres_count(spec: &str, parse_errors: &mut u64) -> f64 {
    let spec = ANNOTATION.replace_all(spec, "${1}");
    let mut count = 0.0;
    for part in spec.split(',') {
        let part = part.trim();
        if !part.contains("gpu:") {
            continue;
        }
        match GPU_SPEC.captures(part) {
            Some(caps) => count += number_or_zero(&caps[2], parse_errors),
            None => *parse_errors += 1,
        }
    }
    count
}

/// Sum of nodes × GPUs over the lines of a two-column listing (`--Format=Nodes: ,Gres:` or
/// `Nodes: ,GresUsed:`).  Lines that do not mention a GPU are skipped.

fn sum_two_column(input: &str) -> Parsed<f64> {
    let mut parse_errors = 0;
    let mut sum = 0.0;
    for line in input.lines().filter(|l| l.contains("gpu:")) {
        let fields = line.split_whitespace().collect::<Vec<&str>>();
        if fields.len() < 2 {
            parse_errors += 1;
            continue;
        }
        let nodes = number_or_zero(fields[0], &mut parse_errors);
        sum += nodes * parse_gres_count(fields[1], &mut parse_errors);
    }
    Parsed::new(sum, parse_errors)
}

/// Installed GPUs, from `sinfo -a -h --Format=Nodes: ,Gres:`.
pub fn parse_total_gpus(input: &str) -> Parsed<f64> {
    sum_two_column(input)
}

/// GPUs in use, from `sinfo -a -h --Format=Nodes: ,GresUsed: --state=allocated`.
pub fn parse_allocated_gpus(input: &str) -> Parsed<f64> {
    sum_two_column(input)
}

/// Free GPUs on nodes that can take work, from
/// `sinfo -a -h --Format=Nodes: ,Gres: ,GresUsed: --state=idle,allocated`.  Each line contributes
/// nodes × (installed − used); a line without a GresUsed column counts all installed GPUs as free.

pub fn parse_idle_gpus(input: &str) -> Parsed<f64> {
    let mut parse_errors = 0;
    let mut sum = 0.0;
    for line in input.lines().filter(|l| l.contains("gpu:")) {
        let fields = line.split_whitespace().collect::<Vec<&str>>();
        if fields.len() < 2 {
            parse_errors += 1;
            continue;
        }
        let nodes = number_or_zero(fields[0], &mut parse_errors);
        let installed = parse_gres_count(fields[1], &mut parse_errors);
        let used = match fields.get(2) {
            Some(f) => parse_gres_count(f, &mut parse_errors),
            None => 0.0,
        };
        if used > installed {
            parse_errors += 1;
            continue;
        }
        sum += nodes * (installed - used);
    }
    Parsed::new(sum, parse_errors)
}

#[test]
fn test_parse_gres_count() {
    let mut errs = 0;
    assert!(parse_gres_count("gpu:4", &mut errs) == 4.0);
    assert!(parse_gres_count("gpu:a100:4(S:0-1)", &mut errs) == 4.0);
    assert!(parse_gres_count("gpu:(null):3(IDX:0-2)", &mut errs) == 3.0);
    assert!(parse_gres_count("gpu:a100:2,gpu:v100:1", &mut errs) == 3.0);
    assert!(parse_gres_count("gpu:2(IDX:0-1),mps:0", &mut errs) == 2.0);
    assert!(parse_gres_count("(null)", &mut errs) == 0.0);
    assert!(parse_gres_count("mps:400", &mut errs) == 0.0);
    assert!(errs == 0);
    assert!(parse_gres_count("gpu:a100", &mut errs) == 0.0);
    assert!(errs == 1);
}

#[test]
fn test_gpu_listings() {
    let total = parse_total_gpus(include_str!("../testdata/sinfo_gpus_total.txt"));
    let allocated = parse_allocated_gpus(include_str!("../testdata/sinfo_gpus_alloc.txt"));
    let idle = parse_idle_gpus(include_str!("../testdata/sinfo_gpus_idle.txt"));
    assert!(total.parse_errors == 0 && allocated.parse_errors == 0 && idle.parse_errors == 0);
    assert!(total.value == 68.0);
    assert!(allocated.value == 24.0);
    assert!(idle.value == 40.0);

    let g = GpuCounts::derive(total.value, allocated.value, idle.value);
    assert!(g.other == 4.0);
    assert!(g.utilization == 24.0 / 68.0);
}

#[test]
fn test_idle_is_per_line() {
    let total = parse_total_gpus("1 gpu:5\n").value;
    let allocated = parse_allocated_gpus("1 gpu:2\n").value;
    let idle = parse_idle_gpus("1 gpu:5 gpu:2\n").value;
    let g = GpuCounts::derive(total, allocated, idle);
    assert!(g.idle == 3.0);
    assert!(g.other == 0.0);
    assert!(g.utilization == 0.4);

    // Without a GresUsed column everything installed is free.
    assert!(parse_idle_gpus("2 gpu:4\n").value == 8.0);
}

#[test]
fn test_no_gpus() {
    let g = GpuCounts::derive(
        parse_total_gpus("").value,
        parse_allocated_gpus("").value,
        parse_idle_gpus("").value,
    );
    assert!(g == GpuCounts::default());
}
