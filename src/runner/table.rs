//! Tabular view of result records.
//!
//! Records are heterogeneous: different behaviors and evaluators populate
//! different keys. The view takes the union of all keys as columns and fills
//! gaps with nulls. Column order is `scen_set`, `scen_idx`, `step`,
//! `behavior`, the remaining keys sorted by name, then `Terminal`.

use std::collections::BTreeSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde_json::Value;

use super::result::{display_value, ResultRecord, BEHAVIOR, SCEN_IDX, SCEN_SET, STEP, TERMINAL};

const LEADING_COLUMNS: [&str; 4] = [SCEN_SET, SCEN_IDX, STEP, BEHAVIOR];

/// Storage type inferred for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Int64,
    Float64,
    Utf8,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(n) if n.is_i64() => Some(Self::Int64),
            Value::Number(_) => Some(Self::Float64),
            _ => Some(Self::Utf8),
        }
    }

    fn merge(self, other: Self) -> Self {
        use ColumnKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int64, Float64) | (Float64, Int64) => Float64,
            _ => Utf8,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
        }
    }
}

/// Ordered union of the keys of all records.
pub fn column_names(records: &[ResultRecord]) -> Vec<String> {
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();

    let mut columns: Vec<String> = LEADING_COLUMNS
        .iter()
        .filter(|name| keys.contains(*name))
        .map(|name| name.to_string())
        .collect();
    columns.extend(
        keys.iter()
            .copied()
            .filter(|key| !LEADING_COLUMNS.contains(key) && *key != TERMINAL)
            .map(|key| key.to_string()),
    );
    if keys.contains(TERMINAL) {
        columns.push(TERMINAL.to_string());
    }
    columns
}

fn infer_kind(records: &[ResultRecord], column: &str) -> ColumnKind {
    records
        .iter()
        .filter_map(|record| record.get(column).and_then(ColumnKind::of))
        .reduce(ColumnKind::merge)
        .unwrap_or(ColumnKind::Utf8)
}

fn build_column(records: &[ResultRecord], column: &str, kind: ColumnKind) -> ArrayRef {
    let cells = records
        .iter()
        .map(|record| record.get(column).filter(|v| !v.is_null()));

    match kind {
        ColumnKind::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(records.len());
            for cell in cells {
                builder.append_option(cell.and_then(Value::as_bool));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Int64 => {
            let mut builder = Int64Builder::with_capacity(records.len());
            for cell in cells {
                builder.append_option(cell.and_then(Value::as_i64));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Float64 => {
            let mut builder = Float64Builder::with_capacity(records.len());
            for cell in cells {
                builder.append_option(cell.and_then(Value::as_f64));
            }
            Arc::new(builder.finish())
        }
        ColumnKind::Utf8 => {
            let mut builder = StringBuilder::new();
            for cell in cells {
                builder.append_option(cell.map(display_value));
            }
            Arc::new(builder.finish())
        }
    }
}

/// Converts records into an Arrow `RecordBatch`, one row per record.
pub fn records_to_record_batch(records: &[ResultRecord]) -> Result<RecordBatch, ArrowError> {
    let names = column_names(records);
    let mut fields = Vec::with_capacity(names.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(names.len());

    for name in &names {
        let kind = infer_kind(records, name);
        fields.push(Field::new(name.as_str(), kind.data_type(), true));
        columns.push(build_column(records, name, kind));
    }

    let options = RecordBatchOptions::new().with_row_count(Some(records.len()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, BooleanArray, Float64Array, Int64Array, StringArray};
    use serde_json::json;

    fn record(value: Value) -> ResultRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_column_order() {
        let records = vec![
            record(json!({"Terminal": [], "zeta": 1, "behavior": "idm", "alpha": 2,
                          "scen_set": "a", "step": 3, "scen_idx": 0})),
        ];
        assert_eq!(
            column_names(&records),
            vec!["scen_set", "scen_idx", "step", "behavior", "alpha", "zeta", "Terminal"]
        );
    }

    #[test]
    fn test_type_inference() {
        let records = vec![
            record(json!({"flag": true, "count": 1, "speed": 1, "label": "x", "mixed": 1})),
            record(json!({"flag": false, "count": 2, "speed": 2.5, "label": "y", "mixed": "z"})),
        ];
        let batch = records_to_record_batch(&records).unwrap();
        let schema = batch.schema();
        assert_eq!(schema.field_with_name("flag").unwrap().data_type(), &DataType::Boolean);
        assert_eq!(schema.field_with_name("count").unwrap().data_type(), &DataType::Int64);
        assert_eq!(schema.field_with_name("speed").unwrap().data_type(), &DataType::Float64);
        assert_eq!(schema.field_with_name("label").unwrap().data_type(), &DataType::Utf8);
        assert_eq!(schema.field_with_name("mixed").unwrap().data_type(), &DataType::Utf8);

        let speed = batch
            .column_by_name("speed")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(speed.value(0), 1.0);
        let mixed = batch
            .column_by_name("mixed")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(mixed.value(0), "1");
        assert_eq!(mixed.value(1), "z");
    }

    #[test]
    fn test_null_fill() {
        let records = vec![
            record(json!({"step": 4, "collision": true})),
            record(json!({"step": 2})),
            record(json!({"step": 9, "collision": null})),
        ];
        let batch = records_to_record_batch(&records).unwrap();
        let collision = batch
            .column_by_name("collision")
            .unwrap()
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(collision.value(0));
        assert!(collision.is_null(1));
        assert!(collision.is_null(2));

        let steps = batch
            .column_by_name("step")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(steps.values().to_vec(), vec![4, 2, 9]);
    }

    #[test]
    fn test_terminal_lists_render_as_json() {
        let records = vec![
            record(json!({"Terminal": ["collision", "goal_reached"]})),
            record(json!({"Terminal": "exception_raised"})),
        ];
        let batch = records_to_record_batch(&records).unwrap();
        let terminal = batch
            .column_by_name("Terminal")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(terminal.value(0), "[\"collision\",\"goal_reached\"]");
        assert_eq!(terminal.value(1), "exception_raised");
    }

    #[test]
    fn test_empty_records() {
        let batch = records_to_record_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 0);
    }
}
