// Field-level helpers.  Slurm tools print numbers as plain decimal text, separate columns either with
// a single delimiter character (`-o "%a|%b"`) or with space padding (`-O "Name:25,..."`), and print
// empty fields where a value is not available.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

/// Parse a nonnegative number.  An empty field is zero and not an error.  Anything else that does
/// not decode as a finite nonnegative number is zero and bumps `parse_errors`.

pub fn number_or_zero(field: &str, parse_errors: &mut u64) -> f64 {
    let v: f64 = parse_or_zero(field, parse_errors);
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        *parse_errors += 1;
        0.0
    }
}

fn parse_or_zero<T: FromStr + Default>(field: &str, parse_errors: &mut u64) -> T {
    let field = field.trim();
    if field.is_empty() {
        return T::default();
    }
    match T::from_str(field) {
        Ok(v) => v,
        Err(_) => {
            *parse_errors += 1;
            T::default()
        }
    }
}

/// The non-blank lines of `input`, sorted and with exact duplicates removed.  sinfo reports the same
/// node once per partition it belongs to, and some listings repeat lines verbatim.

pub fn sorted_unique_lines(input: &str) -> Vec<&str> {
    input
        .lines()
        .filter(|l| !l.trim().is_empty())
        .sorted()
        .dedup()
        .collect()
}

/// Split delimiter-separated records.  Lines without the delimiter (blank lines, notices) are dropped
/// silently; fields are trimmed.  There is no quoting in Slurm's output, so a quote character is
/// ordinary text.

pub fn split_records(input: &str, delimiter: u8, parse_errors: &mut u64) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .quoting(false)
        .from_reader(input.as_bytes());

    let mut records = vec![];
    for record in reader.records() {
        match record {
            Ok(record) => {
                if record.len() < 2 {
                    continue;
                }
                records.push(record.iter().map(|f| f.trim().to_string()).collect());
            }
            Err(_) => {
                *parse_errors += 1;
            }
        }
    }
    records
}

/// A record whose middle field is free text that may itself contain the delimiter.
pub struct Spanned<'a> {
    pub head: Vec<&'a str>,
    pub middle: &'a str,
    pub tail: Vec<&'a str>,
}

/// Take `head` fields from the front of `line` and `tail` fields from the back, all trimmed.  The
/// middle is the raw text between them with only its outer whitespace removed, so a delimiter inside
/// it survives with its spacing.  None if the line has fewer than `head + tail + 1` fields.

pub fn split_around(line: &str, delimiter: char, head: usize, tail: usize) -> Option<Spanned<'_>> {
    let mut front = line.splitn(head + 1, delimiter);
    let head_fields = front.by_ref().take(head).map(str::trim).collect::<Vec<_>>();
    let rest = front.next()?;
    let mut back = rest.rsplitn(tail + 1, delimiter);
    let mut tail_fields = back.by_ref().take(tail).map(str::trim).collect::<Vec<_>>();
    let middle = back.next()?;
    tail_fields.reverse();
    Some(Spanned {
        head: head_fields,
        middle: middle.trim(),
        tail: tail_fields,
    })
}

static COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Split a line of space-padded columns.  A single space belongs to the value (node reasons such as
/// "Not responding"), two or more separate columns.

pub fn split_padded_columns(line: &str) -> Vec<&str> {
    let line = line.trim();
    if line.is_empty() {
        return vec![];
    }
    COLUMN_GAP.split(line).collect()
}

#[test]
fn test_number_or_zero() {
    let mut errs = 0;
    assert!(number_or_zero("12", &mut errs) == 12.0);
    assert!(number_or_zero(" 0.25 ", &mut errs) == 0.25);
    assert!(number_or_zero("", &mut errs) == 0.0);
    assert!(errs == 0);
    assert!(number_or_zero("N/A", &mut errs) == 0.0);
    assert!(number_or_zero("-3", &mut errs) == 0.0);
    assert!(number_or_zero("inf", &mut errs) == 0.0);
    assert!(errs == 3);
}

#[test]
fn test_sorted_unique_lines() {
    let xs = sorted_unique_lines("b\n\na\nb\n   \na\r\n");
    assert!(xs == vec!["a", "b"]);
}

#[test]
fn test_split_records() {
    let mut errs = 0;
    let rs = split_records("a|b|c\nno delimiter here\n\n x | \"y\" \n", b'|', &mut errs);
    assert!(errs == 0);
    assert!(rs.len() == 2);
    assert!(rs[0] == vec!["a", "b", "c"]);
    assert!(rs[1] == vec!["x", "\"y\""]);
}

#[test]
fn test_split_padded_columns() {
    let cols = split_padded_columns("b003     296960   Not responding    slurm(64030)  ");
    assert!(cols == vec!["b003", "296960", "Not responding", "slurm(64030)"]);
    assert!(split_padded_columns("   ").is_empty());
}

#[test]
fn test_split_around() {
    let r = split_around("long,PENDING,64,(ReqNodeNotAvail, UnavailableNodes:c[1-4]), carol ", ',', 3, 1).unwrap();
    assert!(r.head == vec!["long", "PENDING", "64"]);
    assert!(r.middle == "(ReqNodeNotAvail, UnavailableNodes:c[1-4])");
    assert!(r.tail == vec!["carol"]);

    let r = split_around("a|b|||d", '|', 2, 1).unwrap();
    assert!(r.middle == "|");
    assert!(split_around("a,b,,c", ',', 2, 1).unwrap().middle == "");

    assert!(split_around("a,b", ',', 2, 1).is_none());
    assert!(split_around("a,b,c", ',', 2, 1).is_none());
    assert!(split_around("a,b,c", ',', 3, 1).is_none());
    assert!(split_around("", ',', 1, 1).is_none());
}
