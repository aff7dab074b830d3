//! Parquet and JSON-lines writers for the tabular view of a result.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow::json::LineDelimitedWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::PersistenceError;

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build()
}

fn create_output(output_path: &Path) -> Result<File, PersistenceError> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(output_path)?)
}

/// Write a result table to a Parquet file on disk.
pub fn write_parquet(batch: &RecordBatch, output_path: &Path) -> Result<(), PersistenceError> {
    if batch.num_rows() == 0 {
        return Err(PersistenceError::NoRecords);
    }

    let file = create_output(output_path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(writer_properties()))?;
    writer.write(batch)?;
    writer.close()?;

    tracing::info!(
        path = %output_path.display(),
        rows = batch.num_rows(),
        "Parquet file written"
    );

    Ok(())
}

/// Write a result table to Parquet bytes in memory.
pub fn write_parquet_bytes(batch: &RecordBatch) -> Result<Vec<u8>, PersistenceError> {
    if batch.num_rows() == 0 {
        return Err(PersistenceError::NoRecords);
    }

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(writer_properties()))?;
    writer.write(batch)?;
    writer.close()?;

    Ok(buf)
}

/// Read every batch of a Parquet file.
pub fn read_parquet(input_path: &Path) -> Result<Vec<RecordBatch>, PersistenceError> {
    let file = File::open(input_path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        path = %input_path.display(),
        rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
        "Parquet file loaded"
    );

    Ok(batches)
}

/// Write a result table as one JSON object per line. Null cells are omitted.
pub fn write_json_lines(batch: &RecordBatch, output_path: &Path) -> Result<(), PersistenceError> {
    let file = create_output(output_path)?;
    let mut out = BufWriter::new(file);
    {
        let mut writer = LineDelimitedWriter::new(&mut out);
        writer.write(batch)?;
        writer.finish()?;
    }
    out.flush()?;

    tracing::info!(
        path = %output_path.display(),
        rows = batch.num_rows(),
        "JSON lines written"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{records_to_record_batch, ResultRecord};
    use serde_json::json;
    use tempfile::TempDir;

    fn make_test_batch() -> RecordBatch {
        let records: Vec<ResultRecord> = vec![
            serde_json::from_value(json!({"scen_set": "highway", "scen_idx": 0, "step": 12,
                "behavior": "idm", "collision": false, "Terminal": ["goal_reached"]}))
            .unwrap(),
            serde_json::from_value(json!({"scen_set": "highway", "scen_idx": 1, "step": 0,
                "behavior": "idm", "Terminal": "exception_raised"}))
            .unwrap(),
        ];
        records_to_record_batch(&records).unwrap()
    }

    #[test]
    fn test_write_and_read_parquet() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/results.parquet");
        let batch = make_test_batch();

        write_parquet(&batch, &path).unwrap();
        assert!(path.exists());

        let loaded = read_parquet(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].num_rows(), 2);
        let names = |b: &RecordBatch| -> Vec<String> {
            b.schema().fields().iter().map(|f| f.name().clone()).collect()
        };
        assert_eq!(names(&loaded[0]), names(&batch));
        assert_eq!(
            loaded[0].column_by_name("step").unwrap().as_ref(),
            batch.column_by_name("step").unwrap().as_ref()
        );
    }

    #[test]
    fn test_write_parquet_bytes() {
        let bytes = write_parquet_bytes(&make_test_batch()).unwrap();
        assert!(!bytes.is_empty());
        // Parquet magic bytes: PAR1
        assert_eq!(&bytes[..4], b"PAR1");
    }

    #[test]
    fn test_empty_table_error() {
        let empty = records_to_record_batch(&[]).unwrap();
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            write_parquet(&empty, &temp.path().join("empty.parquet")),
            Err(PersistenceError::NoRecords)
        ));
    }

    #[test]
    fn test_write_json_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("results.jsonl");
        write_json_lines(&make_test_batch(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["step"], json!(12));
        assert_eq!(lines[0]["collision"], json!(false));
        assert_eq!(lines[1]["Terminal"], json!("exception_raised"));
        assert!(lines[1].get("collision").is_none());
    }
}
