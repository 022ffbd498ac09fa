//! End-to-end behavior of the persisted benchmark history.

use benchwatch_benchmarks::io::{self, DataFormat};
use benchwatch_benchmarks::{RunIngestor, SeriesStore, StoreError, StoreResult};
use benchwatch_core::Commit;
use serde_json::json;

const TOOL: &str = "customSmallerIsBetter";
const SCENARIO: &str = "Nightly - Backpressure/OTLP-ATTR-OTAP - Dropped Log Count";

fn publish(store: &mut SeriesStore, commit: &str, date: i64, value: f64) -> StoreResult {
    let output = json!([
        { "name": "dropped_logs_total", "unit": "count", "value": value, "extra": SCENARIO }
    ]);
    let run = RunIngestor::new(TOOL)
        .with_date(date)
        .ingest_harness_output(Commit::new(commit, "nightly"), &output)
        .unwrap();
    store.append(TOOL, run).unwrap()
}

#[test]
fn test_query_dates_are_non_decreasing() {
    let mut store = SeriesStore::new("https://github.com/example/pipeline");
    // An old commit re-benchmarked later is appended after newer commits.
    publish(&mut store, "new", 100, 1.0);
    publish(&mut store, "old", 200, 2.0);
    publish(&mut store, "old", 200, 2.0);
    publish(&mut store, "newer", 200, 3.0);

    let dates: Vec<i64> = store
        .query(TOOL, "dropped_logs_total", Some(SCENARIO))
        .iter()
        .map(|o| o.date)
        .collect();
    assert_eq!(dates, vec![100, 200, 200]);
    assert!(dates.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_retried_publish_leaves_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.js");

    let mut store = io::load_store(&path).unwrap();
    publish(&mut store, "abc", 1_736_900_000_000, 999_000.0);
    io::save_store(&store, &path, DataFormat::JavaScript).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();

    let mut retried = io::load_store(&path).unwrap();
    let result = publish(&mut retried, "abc", 1_736_900_000_000, 999_000.0);
    assert_eq!(result, StoreResult::Duplicate { index: 0 });
    io::save_store(&retried, &path, DataFormat::JavaScript).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn test_prior_runs_are_never_mutated() {
    let mut store = SeriesStore::new("");
    publish(&mut store, "a", 1, 1.0);
    let before = store.runs(TOOL)[0].clone();

    publish(&mut store, "b", 2, -100_000.0);
    // Re-publishing the first run after a newer one is a retry, not an error.
    let result = store.append(TOOL, before.clone()).unwrap();

    assert_eq!(result, StoreResult::Duplicate { index: 0 });
    assert_eq!(store.runs(TOOL).len(), 2);
    assert_eq!(store.runs(TOOL)[0], before);
}

#[test]
fn test_forward_compatible_document_survives_round_trip() {
    let text = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 1736900000000,
  "repoUrl": "https://github.com/example/pipeline",
  "entries": {
    "customSmallerIsBetter": [
      {
        "commit": {
          "author": { "email": "dev@example.com", "name": "Dev", "username": "dev" },
          "id": "abc",
          "message": "nightly",
          "url": "https://github.com/example/pipeline/commit/abc",
          "verification": { "verified": true }
        },
        "date": 1736900000000,
        "tool": "customSmallerIsBetter",
        "benches": [
          { "name": "cpu_percentage_normalized_avg", "value": 4.25, "unit": "%", "extra": "Nightly - Syslog - CPU" }
        ],
        "runner": "nightly-01"
      }
    ]
  },
  "schemaVersion": 2
}"#;
    let data = io::parse_document(text).unwrap();
    let rendered = io::render_document(&data, DataFormat::JavaScript).unwrap();
    let reparsed = io::parse_document(&rendered).unwrap();

    assert_eq!(reparsed, data);
    assert_eq!(reparsed.other.get("schemaVersion"), Some(&json!(2)));
    assert!(rendered.contains("\"verification\""));
    assert!(rendered.contains("\"runner\": \"nightly-01\""));
}

#[test]
fn test_out_of_order_publish_is_rejected() {
    let mut store = SeriesStore::new("");
    publish(&mut store, "a", 200, 1.0);
    let run = RunIngestor::new(TOOL)
        .with_date(100)
        .ingest_harness_output(
            Commit::new("b", ""),
            &json!([{ "name": "dropped_logs_total", "unit": "count", "value": 1 }]),
        )
        .unwrap();
    assert!(matches!(
        store.append(TOOL, run),
        Err(StoreError::OutOfOrder { .. })
    ));
}
