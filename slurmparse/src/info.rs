/// The version from `<tool> --version` output, eg "slurm 23.11.6" → "23.11.6".  "unknown" if the
/// output does not have a second word.

pub fn parse_version(output: &str) -> String {
    output
        .split_whitespace()
        .nth(1)
        .unwrap_or("unknown")
        .to_string()
}

#[test]
fn test_parse_version() {
    assert!(parse_version("slurm 23.11.6\n") == "23.11.6");
    assert!(parse_version("slurm-wlm 22.05.8 extra") == "22.05.8");
    assert!(parse_version("slurm") == "unknown");
    assert!(parse_version("") == "unknown");
}
