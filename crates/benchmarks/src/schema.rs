//! Schema evolution tracking.
//!
//! The set of metrics a tool reports changes over time: metrics get
//! introduced, superseded by renamed variants, or change their unit. None of
//! this is an error; this module replays a tool's runs and reports it.

use benchwatch_core::{Run, SeriesKey};
use serde::Serialize;
use std::collections::HashMap;

/// One schema change observed in a tool's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SchemaChange {
    /// A series appeared for the first time.
    MetricAdded {
        /// Series that appeared
        key: SeriesKey,
        /// Run it first appeared in
        run_index: usize,
        /// Unit it was first reported with
        unit: String,
    },
    /// A series changed its reported unit.
    UnitChanged {
        /// Series whose unit changed
        key: SeriesKey,
        /// Previous unit
        from: String,
        /// New unit
        to: String,
        /// Run the new unit first appeared in
        run_index: usize,
    },
    /// A series is absent from the latest run.
    MetricRetired {
        /// Series no longer reported
        key: SeriesKey,
        /// Last run that reported it
        last_run_index: usize,
    },
}

impl SchemaChange {
    /// Series the change applies to.
    pub fn key(&self) -> &SeriesKey {
        match self {
            SchemaChange::MetricAdded { key, .. }
            | SchemaChange::UnitChanged { key, .. }
            | SchemaChange::MetricRetired { key, .. } => key,
        }
    }
}

/// Replay `runs` of `tool` and list schema changes in the order they happened.
///
/// Retirements are listed last, ordered by the last run that reported them.
pub fn schema_changes(tool: &str, runs: &[Run]) -> Vec<SchemaChange> {
    let mut changes = Vec::new();
    let mut last_seen: HashMap<SeriesKey, (usize, String)> = HashMap::new();
    let mut first_order = Vec::new();

    for (run_index, run) in runs.iter().enumerate() {
        for sample in &run.benches {
            let key = sample.series_key(tool);
            match last_seen.get_mut(&key) {
                None => {
                    changes.push(SchemaChange::MetricAdded {
                        key: key.clone(),
                        run_index,
                        unit: sample.unit.clone(),
                    });
                    first_order.push(key.clone());
                    last_seen.insert(key, (run_index, sample.unit.clone()));
                }
                Some((last_index, unit)) => {
                    if *unit != sample.unit {
                        changes.push(SchemaChange::UnitChanged {
                            key: key.clone(),
                            from: unit.clone(),
                            to: sample.unit.clone(),
                            run_index,
                        });
                        *unit = sample.unit.clone();
                    }
                    *last_index = run_index;
                }
            }
        }
    }

    let Some(latest) = runs.len().checked_sub(1) else {
        return changes;
    };

    let mut retired: Vec<(usize, SeriesKey)> = first_order
        .into_iter()
        .filter_map(|key| {
            let last_index = last_seen[&key].0;
            (last_index < latest).then_some((last_index, key))
        })
        .collect();
    retired.sort_by_key(|(last_index, _)| *last_index);

    changes.extend(
        retired
            .into_iter()
            .map(|(last_run_index, key)| SchemaChange::MetricRetired {
                key,
                last_run_index,
            }),
    );
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchwatch_core::{Commit, Sample};

    const TOOL: &str = "customSmallerIsBetter";

    fn run(date: i64, benches: Vec<Sample>) -> Run {
        Run::new(TOOL, Commit::new(format!("c{}", date), ""), date, benches)
    }

    #[test]
    fn test_superseded_metric_is_retired_and_added() {
        let runs = vec![
            run(1, vec![Sample::new("cpu_percentage_avg", 40.0, "%")]),
            run(2, vec![Sample::new("cpu_percentage_normalized_avg", 5.0, "%")]),
        ];

        let changes = schema_changes(TOOL, &runs);
        assert_eq!(changes.len(), 3);
        assert!(matches!(&changes[0], SchemaChange::MetricAdded { run_index: 0, .. }));
        assert!(matches!(
            &changes[1],
            SchemaChange::MetricAdded { key, run_index: 1, .. }
                if key.name == "cpu_percentage_normalized_avg"
        ));
        assert!(matches!(
            &changes[2],
            SchemaChange::MetricRetired { key, last_run_index: 0 }
                if key.name == "cpu_percentage_avg"
        ));
    }

    #[test]
    fn test_unit_change_is_reported_once() {
        let runs = vec![
            run(1, vec![Sample::new("network_tx_bytes_rate_avg", 8000.0, "bits/sec")]),
            run(2, vec![Sample::new("network_tx_bytes_rate_avg", 1000.0, "bytes/sec")]),
            run(3, vec![Sample::new("network_tx_bytes_rate_avg", 1010.0, "bytes/sec")]),
        ];

        let changes = schema_changes(TOOL, &runs);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[1],
            SchemaChange::UnitChanged {
                key: SeriesKey::new(TOOL, "network_tx_bytes_rate_avg", None),
                from: "bits/sec".to_string(),
                to: "bytes/sec".to_string(),
                run_index: 1,
            }
        );
    }

    #[test]
    fn test_empty_history_has_no_changes() {
        assert!(schema_changes(TOOL, &[]).is_empty());
    }
}
