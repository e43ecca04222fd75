// Optional configuration file.  The file is a single JSON object with these optional fields:
//
//   command_timeout_secs - positive integer, the wall-clock limit for each Slurm command
//   collectors - object mapping collector names to booleans, false disables the collector
//
// Example:
//
//   {
//     "command_timeout_secs": 10,
//     "collectors": { "gpus": false, "fairshare": false }
//   }
//
// Command line switches override the file.

use crate::collectors::CollectorName;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, PartialEq)]
pub struct FileConfig {
    pub command_timeout: Option<Duration>,
    pub collectors: HashMap<CollectorName, bool>,
}

// The file is written by hand and will grow fields over time, so it goes through the generic JSON
// parser followed by explicit decoding, and unknown fields are ignored.

pub fn read_from_json(filename: &Path) -> Result<FileConfig> {
    let file = File::open(filename).with_context(|| format!("Opening {}", filename.display()))?;
    let v: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing {}", filename.display()))?;
    decode(&v)
}

fn decode(v: &Value) -> Result<FileConfig> {
    let mut config = FileConfig::default();
    let fields = match v {
        Value::Object(fields) => fields,
        _ => bail!("Expected an object value"),
    };
    if let Some(t) = fields.get("command_timeout_secs") {
        match t.as_u64() {
            Some(n) if n > 0 => config.command_timeout = Some(Duration::from_secs(n)),
            _ => bail!("Field 'command_timeout_secs' must have a positive integer value"),
        }
    }
    if let Some(c) = fields.get("collectors") {
        let Value::Object(toggles) = c else {
            bail!("Field 'collectors' must have an object value");
        };
        for (name, enabled) in toggles {
            let collector = match CollectorName::from_str(name, false) {
                Ok(c) => c,
                Err(_) => bail!("Unknown collector '{name}'"),
            };
            let Value::Bool(enabled) = enabled else {
                bail!("Collector '{name}' must have a boolean value");
            };
            config.collectors.insert(collector, *enabled);
        }
    }
    Ok(config)
}

/// The collectors to run.  Everything is enabled by default, the file may switch collectors off
/// or on, a non-empty `only` list restricts the set, and `disabled` removes collectors last.

pub fn enabled_collectors(
    file: &FileConfig,
    only: &[CollectorName],
    disabled: &[CollectorName],
) -> Vec<CollectorName> {
    CollectorName::all()
        .iter()
        .copied()
        .filter(|c| *file.collectors.get(c).unwrap_or(&true))
        .filter(|c| only.is_empty() || only.contains(c))
        .filter(|c| !disabled.contains(c))
        .collect()
}

#[test]
fn test_decode() {
    let v = serde_json::json!({
        "command_timeout_secs": 10,
        "collectors": { "gpus": false, "node": true },
        "comment": "ignored"
    });
    let c = decode(&v).unwrap();
    assert!(c.command_timeout == Some(Duration::from_secs(10)));
    assert!(c.collectors[&CollectorName::Gpus] == false);
    assert!(c.collectors[&CollectorName::Node] == true);
    assert!(c.collectors.len() == 2);
}

#[test]
fn test_decode_empty() {
    assert!(decode(&serde_json::json!({})).unwrap() == FileConfig::default());
}

#[test]
fn test_decode_errors() {
    assert!(decode(&serde_json::json!([])).is_err());
    assert!(decode(&serde_json::json!({ "command_timeout_secs": 0 })).is_err());
    assert!(decode(&serde_json::json!({ "command_timeout_secs": "5" })).is_err());
    assert!(decode(&serde_json::json!({ "collectors": ["gpus"] })).is_err());
    assert!(decode(&serde_json::json!({ "collectors": { "bogus": true } })).is_err());
    assert!(decode(&serde_json::json!({ "collectors": { "gpus": "no" } })).is_err());
}

#[test]
fn test_read_missing_file() {
    assert!(read_from_json(Path::new("/nonexistent/slurm-exporter.json")).is_err());
}

#[test]
fn test_enabled_collectors() {
    let none = FileConfig::default();
    assert!(enabled_collectors(&none, &[], &[]).len() == CollectorName::all().len());

    let mut file = FileConfig::default();
    file.collectors.insert(CollectorName::Gpus, false);
    file.collectors.insert(CollectorName::Cpus, true);
    let all = enabled_collectors(&file, &[], &[]);
    assert!(!all.contains(&CollectorName::Gpus));
    assert!(all.contains(&CollectorName::Cpus));

    let only = enabled_collectors(&file, &[CollectorName::Cpus, CollectorName::Gpus], &[]);
    assert!(only == vec![CollectorName::Cpus]);

    let cut = enabled_collectors(&file, &[CollectorName::Cpus], &[CollectorName::Cpus]);
    assert!(cut.is_empty());
}
