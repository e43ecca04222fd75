use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// The layout Slurm uses for StartTime, EndTime and friends, without zone information.
const SLURM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a Slurm timestamp, eg "2025-08-26T07:00:00".  The controller prints local time with no
/// offset; it is interpreted as UTC.

pub fn parse_slurm_time(s: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), SLURM_TIME_FORMAT)
        .with_context(|| format!("Bad timestamp {s:?}"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[test]
fn test_parse_slurm_time() {
    let t = parse_slurm_time("2025-08-26T07:00:00").unwrap();
    assert!(t.timestamp() == 1756191600);
    assert!(parse_slurm_time(" 2025-08-29T20:00:00\n").is_ok());
}

#[test]
fn test_parse_slurm_time_bad() {
    assert!(parse_slurm_time("").is_err());
    assert!(parse_slurm_time("Unknown").is_err());
    assert!(parse_slurm_time("2025-08-26 07:00:00").is_err());
    assert!(parse_slurm_time("2025-13-26T07:00:00").is_err());
}
