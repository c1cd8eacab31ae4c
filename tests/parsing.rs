use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use h2h_calibrator::model::Winner;
use h2h_calibrator::store::rest::{parse_events_json, parse_finished_json, parse_odds_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_postgrest_results_fixture() {
    let raw = read_fixture("postgrest_results.json");
    let rows = parse_finished_json(&raw).expect("fixture should parse");
    // The third row has no commence time and is dropped.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].winner, Winner::Home);
    assert_eq!(rows[0].event.home_name, "Jannik Sinner");
    assert_eq!(
        rows[0].event.commence_time,
        Utc.with_ymd_and_hms(2026, 5, 28, 10, 0, 0).unwrap()
    );
    assert_eq!(rows[1].winner, Winner::Other);
    assert_eq!(
        rows[1].event.commence_time,
        Utc.with_ymd_and_hms(2026, 5, 28, 12, 30, 0).unwrap()
    );
}

#[test]
fn parses_postgrest_odds_fixture() {
    let raw = read_fixture("postgrest_odds.json");
    let rows = parse_odds_json(&raw).expect("fixture should parse");
    // Null price and unparseable snapshot rows are dropped.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].price, 2.90);
    assert_eq!(rows[1].outcome_key.as_deref(), Some("Casper Ruud"));
}

#[test]
fn parses_postgrest_events_fixture() {
    let raw = read_fixture("postgrest_events.json");
    let events = parse_events_json(&raw).expect("fixture should parse");
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].id, "4242");
    assert_eq!(
        events[1].commence_time,
        Utc.with_ymd_and_hms(2026, 6, 15, 11, 0, 0).unwrap()
    );
}

#[test]
fn postgrest_null_is_empty() {
    assert!(parse_finished_json("null").expect("null should parse").is_empty());
    assert!(parse_odds_json("[]").expect("empty should parse").is_empty());
    assert!(parse_events_json("null").expect("null should parse").is_empty());
}

#[test]
fn malformed_response_is_an_error() {
    assert!(parse_odds_json("{\"message\": \"JWT expired\"}").is_err());
}
