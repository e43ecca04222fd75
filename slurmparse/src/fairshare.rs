// Fair-share factors, from `sshare -n -P -o account,fairshare`.  The account column is indented to
// show the account tree; user rows sit two or more spaces in under their account and are skipped.

use crate::fields::number_or_zero;
use crate::Parsed;
use std::collections::HashMap;

pub fn parse_fairshare(input: &str) -> Parsed<HashMap<String, f64>> {
    let mut parse_errors = 0;
    let mut accounts = HashMap::new();
    for line in input.lines() {
        if line.starts_with("  ") || !line.contains('|') {
            continue;
        }
        let mut fields = line.split('|');
        let account = fields.next().unwrap_or("").trim();
        let fairshare = number_or_zero(fields.next().unwrap_or(""), &mut parse_errors);
        accounts.insert(account.to_string(), fairshare);
    }
    Parsed::new(accounts, parse_errors)
}

#[test]
fn test_parse_fairshare() {
    let input = "\
root|0.500000
 physics|0.714286
  physics|0.250000
 chem|0.125000
 bio|
";
    let p = parse_fairshare(input);
    assert!(p.parse_errors == 0);
    assert!(p.value.len() == 4);
    assert!(p.value["root"] == 0.5);
    assert!(p.value["physics"] == 0.714286);
    assert!(p.value["chem"] == 0.125);
    assert!(p.value["bio"] == 0.0);
}
