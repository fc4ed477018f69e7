//! Tests for the combiner

use super::*;
use crate::error::Error;
use crate::output::{json_to_arrow, FileSink};
use crate::types::FileFormat;
use arrow::array::StringArray;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;

const PREFIX: &str = "open_weather_data";

fn write_weather(sink: &FileSink, hour: u32, rows: &[(&str, f64)]) {
    let records: Vec<_> = rows
        .iter()
        .map(|(dt, temp)| json!({"request_datetime": dt, "city_name": "Odenton", "temp_fahrenheit": temp}))
        .collect();
    let batch = json_to_arrow(&records, None).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 7, 1, hour, 0, 0).unwrap();
    sink.write_at(&batch, PREFIX, at).unwrap();
}

fn sorted_column(path: &std::path::Path, format: FileFormat, column: &str) -> Vec<String> {
    let batch = crate::output::read_batch(path, format).unwrap();
    let col = arrow::compute::cast(
        batch.column_by_name(column).unwrap(),
        &arrow::datatypes::DataType::Utf8,
    )
    .unwrap();
    col.as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
        .iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_combine_sorts_and_counts() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Csv).unwrap();
    write_weather(&sink, 3, &[("2024-07-01 03:00:00", 70.0)]);
    write_weather(&sink, 1, &[("2024-07-01 01:00:00", 65.0), ("2024-07-01 02:00:00", 66.0)]);
    write_weather(&sink, 0, &[("2024-07-01 00:30:00", 64.0)]);

    let combiner = Combiner::new(dir.path(), FileFormat::Csv);
    let outcome = combiner
        .combine(PREFIX, &CombineOptions::default().sort_by("request_datetime"))
        .unwrap();

    let expected_path = dir.path().join("open_weather_data_combined.csv");
    assert_eq!(
        outcome,
        CombineOutcome::Written {
            path: expected_path.clone(),
            files_combined: 3,
            files_skipped: 0,
            rows: 4,
        }
    );
    assert_eq!(
        sorted_column(&expected_path, FileFormat::Csv, "request_datetime"),
        vec![
            "2024-07-01 00:30:00",
            "2024-07-01 01:00:00",
            "2024-07-01 02:00:00",
            "2024-07-01 03:00:00",
        ]
    );
}

#[test]
fn test_combine_twice_is_byte_identical() {
    for format in [FileFormat::Csv, FileFormat::Parquet] {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path(), format).unwrap();
        write_weather(&sink, 1, &[("2024-07-01 01:00:00", 65.0)]);
        write_weather(&sink, 2, &[("2024-07-01 02:00:00", 66.5)]);

        let combiner = Combiner::new(dir.path(), format);
        let options = CombineOptions::default().sort_by("request_datetime");

        let first = combiner.combine(PREFIX, &options).unwrap();
        let first_bytes = std::fs::read(first.path().unwrap()).unwrap();

        // The first combined output must not feed into the second run
        let second = combiner.combine(PREFIX, &options).unwrap();
        let second_bytes = std::fs::read(second.path().unwrap()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes, "{format}");
    }
}

#[test]
fn test_combine_skips_empty_and_corrupt_files() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Csv).unwrap();
    write_weather(&sink, 1, &[("2024-07-01 01:00:00", 65.0)]);
    write_weather(&sink, 2, &[("2024-07-01 02:00:00", 66.0)]);
    std::fs::write(
        dir.path().join("open_weather_data_2024-07-01_03.00.00.csv"),
        "request_datetime,city_name,temp_fahrenheit\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("open_weather_data_2024-07-01_04.00.00.csv"),
        "request_datetime,city_name\n\"2024-07-01 04:00:00,broken",
    )
    .unwrap();

    let outcome = Combiner::new(dir.path(), FileFormat::Csv)
        .combine(PREFIX, &CombineOptions::default())
        .unwrap();

    match outcome {
        CombineOutcome::Written {
            files_combined,
            files_skipped,
            rows,
            ..
        } => {
            assert_eq!(files_combined, 2);
            assert_eq!(files_skipped, 2);
            assert_eq!(rows, 2);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_combine_skips_corrupt_parquet() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Parquet).unwrap();
    write_weather(&sink, 1, &[("2024-07-01 01:00:00", 65.0)]);
    std::fs::write(
        dir.path().join("open_weather_data_2024-07-01_02.00.00.parquet"),
        b"not parquet at all",
    )
    .unwrap();

    let outcome = Combiner::new(dir.path(), FileFormat::Parquet)
        .combine(PREFIX, &CombineOptions::default())
        .unwrap();

    assert!(matches!(
        outcome,
        CombineOutcome::Written {
            files_combined: 1,
            files_skipped: 1,
            rows: 1,
            ..
        }
    ));
}

#[test]
fn test_combine_keeps_existing_without_overwrite() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Csv).unwrap();
    write_weather(&sink, 1, &[("2024-07-01 01:00:00", 65.0)]);
    let existing = dir.path().join("open_weather_data_combined.csv");
    std::fs::write(&existing, "keep me\n").unwrap();

    let outcome = Combiner::new(dir.path(), FileFormat::Csv)
        .combine(PREFIX, &CombineOptions::default().overwrite(false))
        .unwrap();

    assert_eq!(outcome, CombineOutcome::SkippedExisting { path: existing.clone() });
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "keep me\n");
}

#[test]
fn test_combine_unifies_differing_schemas() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Parquet).unwrap();
    let at = |h| Utc.with_ymd_and_hms(2024, 7, 1, h, 0, 0).unwrap();

    let a = json_to_arrow(&[json!({"id": 1, "value": 2})], None).unwrap();
    let b = json_to_arrow(&[json!({"id": 2, "value": 2.5, "note": "late"})], None).unwrap();
    sink.write_at(&a, "metrics", at(1)).unwrap();
    sink.write_at(&b, "metrics", at(2)).unwrap();

    let outcome = Combiner::new(dir.path(), FileFormat::Parquet)
        .combine("metrics", &CombineOptions::default())
        .unwrap();
    let batch = crate::output::read_batch(outcome.path().unwrap(), FileFormat::Parquet).unwrap();

    let names: Vec<_> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["id", "value", "note"]);
    assert_eq!(batch.num_rows(), 2);
}

#[test]
fn test_combine_without_input() {
    let dir = tempdir().unwrap();
    let outcome = Combiner::new(dir.path(), FileFormat::Csv)
        .combine(PREFIX, &CombineOptions::default())
        .unwrap();
    assert_eq!(outcome, CombineOutcome::NoInput);
    assert!(outcome.path().is_none());
    assert!(!dir.path().join("open_weather_data_combined.csv").exists());
}

#[test]
fn test_combine_rejects_prefix_outside_directory() {
    let root = tempdir().unwrap();
    let dir = root.path().join("data");
    std::fs::create_dir(&dir).unwrap();

    for prefix in ["../x", "a/b", ".hidden", ""] {
        let err = Combiner::new(&dir, FileFormat::Csv)
            .combine(prefix, &CombineOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }), "{prefix}");
    }
    assert!(!root.path().join("x_combined.csv").exists());
}

#[test]
fn test_combine_missing_directory_is_error() {
    let dir = tempdir().unwrap();
    let err = Combiner::new(dir.path().join("missing"), FileFormat::Csv)
        .combine(PREFIX, &CombineOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::DirectoryNotFound { .. }));
}
