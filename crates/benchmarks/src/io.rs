//! I/O operations for the benchmark document.
//!
//! The document is stored either as plain JSON or as a JavaScript file that
//! assigns the JSON to `window.BENCHMARK_DATA`, which dashboards load with a
//! `<script>` tag. Both forms are accepted on read. Writes go to a temporary
//! file in the target directory and are renamed into place, so readers only
//! ever see a complete document.

use benchwatch_core::BenchmarkData;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::store::SeriesStore;

/// Prefix of the JavaScript form of the document.
pub const JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// On-disk representation of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Plain JSON
    Json,
    /// `window.BENCHMARK_DATA = {...}`
    JavaScript,
}

impl DataFormat {
    /// Pick the format from the file extension (`.js` is JavaScript).
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("js") => DataFormat::JavaScript,
            _ => DataFormat::Json,
        }
    }
}

/// Parse a document in either format.
pub fn parse_document(text: &str) -> serde_json::Result<BenchmarkData> {
    let trimmed = text.trim();
    let json = match trimmed.strip_prefix(JS_PREFIX.trim_end()) {
        Some(rest) => rest.trim().trim_end_matches(';'),
        None => trimmed,
    };
    serde_json::from_str(json)
}

/// Render a document in the given format.
pub fn render_document(data: &BenchmarkData, format: DataFormat) -> serde_json::Result<String> {
    let json = serde_json::to_string_pretty(data)?;
    Ok(match format {
        DataFormat::Json => json,
        DataFormat::JavaScript => format!("{}{}", JS_PREFIX, json),
    })
}

/// Load the store from `path`.
///
/// A missing file is the first publish of a repository and yields an empty
/// store.
pub fn load_store(path: impl AsRef<Path>) -> Result<SeriesStore> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No benchmark data yet, starting empty store");
            return Ok(SeriesStore::default());
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let data = parse_document(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        tools = data.entries.len(),
        "Loaded benchmark data"
    );
    Ok(SeriesStore::from_data(data))
}

/// Atomically write the store to `path`.
pub fn save_store(store: &SeriesStore, path: impl AsRef<Path>, format: DataFormat) -> Result<()> {
    let path = path.as_ref();
    let rendered = render_document(store.data(), format)?;
    write_atomic(path, rendered.as_bytes())?;
    info!(
        path = %path.display(),
        runs = store.len(),
        "Saved benchmark data"
    );
    Ok(())
}

/// Replace `path` with `contents` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(contents).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Read any JSON value from a file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchwatch_core::{Commit, Run, Sample};

    const TOOL: &str = "customSmallerIsBetter";

    fn sample_store() -> SeriesStore {
        let mut store = SeriesStore::new("https://github.com/example/pipeline");
        store
            .append(
                TOOL,
                Run::new(
                    TOOL,
                    Commit::new("abc123", "nightly"),
                    1_736_900_000_000,
                    vec![Sample::new("dropped_logs_total", 999000.0, "count")
                        .with_extra("Nightly - Backpressure - Dropped Log Count")],
                ),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(DataFormat::from_path("dev/bench/data.js"), DataFormat::JavaScript);
        assert_eq!(DataFormat::from_path("data.json"), DataFormat::Json);
    }

    #[test]
    fn test_parse_javascript_wrapper() {
        let text = "window.BENCHMARK_DATA = {\n  \"lastUpdate\": 5,\n  \"repoUrl\": \"r\",\n  \
                    \"entries\": {}\n};\n";
        let data = parse_document(text).unwrap();
        assert_eq!(data.last_update, 5);
        assert_eq!(data.repo_url, "r");
    }

    #[test]
    fn test_render_javascript_wrapper() {
        let store = sample_store();
        let text = render_document(store.data(), DataFormat::JavaScript).unwrap();
        assert!(text.starts_with("window.BENCHMARK_DATA = {\n  \"lastUpdate\": 1736900000000,"));
        assert_eq!(parse_document(&text).unwrap(), *store.data());
    }

    #[test]
    fn test_tool_and_unknown_field_order_survives_round_trip() {
        let text = r#"window.BENCHMARK_DATA = {
  "lastUpdate": 5,
  "repoUrl": "r",
  "entries": {
    "zeta": [],
    "alpha": []
  },
  "zExtra": 1,
  "aExtra": 2
}"#;
        let data = parse_document(text).unwrap();
        assert_eq!(
            data.entries.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha"]
        );
        assert_eq!(render_document(&data, DataFormat::JavaScript).unwrap(), text);
    }

    #[test]
    fn test_appending_to_second_tool_keeps_tool_order() {
        let mut store = sample_store();
        store
            .append(
                "customBiggerIsBetter",
                Run::new(
                    "customBiggerIsBetter",
                    Commit::new("abc123", "nightly"),
                    1_736_900_000_000,
                    vec![Sample::new("throughput", 10.0, "ops/s")],
                ),
            )
            .unwrap();
        let text = render_document(store.data(), DataFormat::Json).unwrap();
        let reparsed = parse_document(&text).unwrap();
        assert_eq!(
            reparsed.entries.keys().collect::<Vec<_>>(),
            vec![TOOL, "customBiggerIsBetter"]
        );
        assert_eq!(render_document(&reparsed, DataFormat::Json).unwrap(), text);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.js");
        let store = sample_store();

        save_store(&store, &path, DataFormat::from_path(&path)).unwrap();
        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_load_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = load_store(dir.path().join("data.js")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "window.BENCHMARK_DATA = not json").unwrap();
        assert!(matches!(load_store(&path), Err(StoreError::Parse { .. })));
    }
}
