//! Grouped evaluation summary.
//!
//! Averages the requested criteria per (scenario set, behavior). Readings are
//! coerced to numbers where possible: booleans count as 0/1 and numeric
//! strings are parsed. Anything else is skipped rather than treated as an
//! error, so a group whose readings are all non-numeric reports no mean.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::result::{display_value, ResultRecord, BEHAVIOR, SCEN_SET};

/// Mean readings of one (scenario set, behavior) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub scen_set: String,
    pub behavior: String,
    pub count: usize,
    /// One entry per criterion, `None` when no numeric reading exists.
    pub means: Vec<Option<f64>>,
}

/// Grouped means over a set of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub criteria: Vec<String>,
    pub groups: Vec<GroupSummary>,
}

/// Numeric interpretation of a record field, if it has one.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    sums: Vec<f64>,
    counts: Vec<usize>,
}

impl EvaluationSummary {
    /// Groups `records` by scenario set and behavior and averages `criteria`.
    ///
    /// Groups are ordered by (scenario set, behavior).
    pub fn from_records(records: &[ResultRecord], criteria: &[String]) -> Self {
        let mut groups: BTreeMap<(String, String), Accumulator> = BTreeMap::new();

        for record in records {
            let key = (
                record.get(SCEN_SET).map(display_value).unwrap_or_default(),
                record.get(BEHAVIOR).map(display_value).unwrap_or_default(),
            );
            let acc = groups.entry(key).or_insert_with(|| Accumulator {
                count: 0,
                sums: vec![0.0; criteria.len()],
                counts: vec![0; criteria.len()],
            });
            acc.count += 1;
            for (i, criterion) in criteria.iter().enumerate() {
                if let Some(v) = record.get(criterion).and_then(coerce_numeric) {
                    acc.sums[i] += v;
                    acc.counts[i] += 1;
                }
            }
        }

        let groups = groups
            .into_iter()
            .map(|((scen_set, behavior), acc)| GroupSummary {
                scen_set,
                behavior,
                count: acc.count,
                means: acc
                    .sums
                    .iter()
                    .zip(&acc.counts)
                    .map(|(sum, n)| (*n > 0).then(|| sum / *n as f64))
                    .collect(),
            })
            .collect();

        Self {
            criteria: criteria.to_vec(),
            groups,
        }
    }

    /// Mean of `criterion` for one group.
    pub fn mean(&self, scen_set: &str, behavior: &str, criterion: &str) -> Option<f64> {
        let column = self.criteria.iter().position(|c| c == criterion)?;
        self.groups
            .iter()
            .find(|g| g.scen_set == scen_set && g.behavior == behavior)
            .and_then(|g| g.means[column])
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec![SCEN_SET.to_string(), BEHAVIOR.to_string()];
        header.extend(self.criteria.iter().cloned());

        let rows: Vec<Vec<String>> = self
            .groups
            .iter()
            .map(|g| {
                let mut row = vec![g.scen_set.clone(), g.behavior.clone()];
                row.extend(g.means.iter().map(|m| match m {
                    Some(v) => format!("{:.3}", v),
                    None => "NaN".to_string(),
                }));
                row
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                rows.iter()
                    .map(|r| r[i].len())
                    .chain(std::iter::once(header[i].len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let line: Vec<String> = cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, width))| {
                    if i < 2 {
                        format!("{:<width$}", cell, width = *width)
                    } else {
                        format!("{:>width$}", cell, width = *width)
                    }
                })
                .collect();
            writeln!(f, "{}", line.join("  ").trim_end())
        };

        write_row(f, &header)?;
        for row in &rows {
            write_row(f, row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ResultRecord {
        serde_json::from_value(value).unwrap()
    }

    fn criteria() -> Vec<String> {
        vec!["collision".to_string(), "step".to_string()]
    }

    #[test]
    fn test_grouped_means() {
        let records = vec![
            record(json!({"scen_set": "highway", "behavior": "idm", "collision": true, "step": 10})),
            record(json!({"scen_set": "highway", "behavior": "idm", "collision": false, "step": 20})),
            record(json!({"scen_set": "highway", "behavior": "const_vel", "collision": true, "step": 4})),
        ];
        let summary = EvaluationSummary::from_records(&records, &criteria());

        assert_eq!(summary.groups.len(), 2);
        assert_eq!(summary.mean("highway", "idm", "collision"), Some(0.5));
        assert_eq!(summary.mean("highway", "idm", "step"), Some(15.0));
        assert_eq!(summary.mean("highway", "const_vel", "step"), Some(4.0));
        // groups sorted by (set, behavior)
        assert_eq!(summary.groups[0].behavior, "const_vel");
    }

    #[test]
    fn test_non_numeric_readings_are_ignored() {
        let records = vec![
            record(json!({"scen_set": "s", "behavior": "b", "step": 0, "Terminal": "exception_raised"})),
            record(json!({"scen_set": "s", "behavior": "b", "step": "6", "collision": {"x": 1}})),
        ];
        let summary = EvaluationSummary::from_records(&records, &criteria());
        assert_eq!(summary.mean("s", "b", "step"), Some(3.0));
        assert_eq!(summary.mean("s", "b", "collision"), None);
        assert_eq!(summary.groups[0].count, 2);
    }

    #[test]
    fn test_display_has_header_and_rows() {
        let records = vec![record(json!({"scen_set": "highway", "behavior": "idm", "collision": false, "step": 12}))];
        let text = EvaluationSummary::from_records(&records, &criteria()).to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("scen_set"));
        assert!(lines[0].ends_with("step"));
        assert!(lines[1].contains("12.000"));
        assert!(lines[1].contains("0.000"));
    }
}
