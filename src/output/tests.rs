//! Tests for output module

use super::*;
use crate::error::Error;
use crate::types::FileFormat;
use arrow::array::{Array, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn names(schema: &Schema) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().clone()).collect()
}

fn weather_batch(rows: &[(&str, f64)]) -> arrow::record_batch::RecordBatch {
    let records: Vec<_> = rows
        .iter()
        .map(|(dt, temp)| json!({"request_datetime": dt, "city_name": "Odenton", "temp_fahrenheit": temp}))
        .collect();
    json_to_arrow(&records, None).unwrap()
}

// ============================================================================
// Schema Inference Tests
// ============================================================================

#[test]
fn test_infer_schema_empty() {
    let schema = infer_schema(&[]);
    assert!(schema.fields().is_empty());
}

#[test]
fn test_infer_schema_keeps_first_seen_order() {
    let records = vec![
        json!({"video_id": "a", "title": "t", "views": 3}),
        json!({"video_id": "b", "extra": true}),
    ];

    let schema = infer_schema(&records);
    assert_eq!(names(&schema), vec!["video_id", "title", "views", "extra"]);
    assert_eq!(schema.field_with_name("views").unwrap().data_type(), &DataType::Int64);
    assert_eq!(schema.field_with_name("extra").unwrap().data_type(), &DataType::Boolean);
}

#[test]
fn test_infer_schema_with_nulls() {
    let records = vec![json!({"email": null}), json!({"email": "a@b.c"})];
    let schema = infer_schema(&records);
    assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
}

#[test]
fn test_infer_schema_mixed_numbers() {
    let records = vec![json!({"value": 42}), json!({"value": 3.5})];
    let schema = infer_schema(&records);
    assert_eq!(schema.field(0).data_type(), &DataType::Float64);
}

#[test]
fn test_infer_schema_nested_becomes_string() {
    let records = vec![json!({"coord": {"lon": 1.0}, "tags": ["a"]})];
    let schema = infer_schema(&records);
    assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
    assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
}

#[test]
fn test_merge_types_widening() {
    assert_eq!(merge_types(&DataType::Null, &DataType::Int64), DataType::Int64);
    assert_eq!(merge_types(&DataType::Int64, &DataType::Float64), DataType::Float64);
    assert_eq!(merge_types(&DataType::Boolean, &DataType::Int64), DataType::Utf8);
}

#[test]
fn test_merge_schemas_ordered_union() {
    let a = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("value", DataType::Int64, true),
    ]);
    let b = Schema::new(vec![
        Field::new("value", DataType::Float64, true),
        Field::new("note", DataType::Utf8, false),
    ]);

    let merged = merge_schemas(&a, &b);
    assert_eq!(names(&merged), vec!["id", "value", "note"]);
    assert_eq!(merged.field(1).data_type(), &DataType::Float64);
    assert!(merged.field(2).is_nullable());
}

// ============================================================================
// JSON -> Arrow Tests
// ============================================================================

#[test]
fn test_json_to_arrow_simple() {
    let records = vec![json!({"name": "Alice", "age": 30}), json!({"name": "Bob", "age": null})];
    let batch = json_to_arrow(&records, None).unwrap();

    assert_eq!(batch.num_rows(), 2);
    let ages = batch
        .column_by_name("age")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ages.value(0), 30);
    assert!(ages.is_null(1));
}

#[test]
fn test_json_to_arrow_empty_with_schema() {
    let schema = Schema::new(vec![Field::new("id", DataType::Int64, true)]);
    let batch = json_to_arrow(&[], Some(&schema)).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 1);
}

#[test]
fn test_json_to_arrow_timestamp_coercion() {
    let schema = Schema::new(vec![Field::new("published_at", timestamp_type(), false)]);
    let records = vec![
        json!({"published_at": "2024-03-01T12:00:00Z"}),
        json!({"published_at": "2024-03-01 12:00:01"}),
    ];

    let batch = json_to_arrow(&records, Some(&schema)).unwrap();
    let ts = batch
        .column(0)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .unwrap();

    let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(ts.value(0), expected.timestamp_micros());
    assert_eq!(ts.value(1) - ts.value(0), 1_000_000);
    assert_eq!(batch.schema().field(0).data_type(), &timestamp_type());
}

#[test]
fn test_json_to_arrow_bad_timestamp_is_decode_error() {
    let schema = Schema::new(vec![Field::new("published_at", timestamp_type(), true)]);
    let err = json_to_arrow(&[json!({"published_at": "yesterday"})], Some(&schema)).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[test]
fn test_coerce_timestamps() {
    let batch = weather_batch(&[("2024-01-02 03:04:05", 50.0)]);
    let coerced = coerce_timestamps(&batch, &["request_datetime", "missing"]).unwrap();

    assert_eq!(
        coerced.schema().field_with_name("request_datetime").unwrap().data_type(),
        &timestamp_type()
    );
    assert_eq!(
        coerced.schema().field_with_name("city_name").unwrap().data_type(),
        &DataType::Utf8
    );
}

#[test]
fn test_parse_timestamp_shapes() {
    let expected = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(parse_timestamp("2024-01-02T03:04:05Z"), Some(expected));
    assert_eq!(parse_timestamp("2024-01-02T05:04:05+02:00"), Some(expected));
    assert_eq!(parse_timestamp("2024-01-02 03:04:05"), Some(expected));
    assert!(parse_timestamp("2024-01-02").is_some());
    assert_eq!(parse_timestamp("not a date"), None);
}

#[test]
fn test_unify_batches_fills_missing_and_widens() {
    let a = json_to_arrow(&[json!({"id": 1, "value": 2})], None).unwrap();
    let b = json_to_arrow(&[json!({"id": 2, "value": 2.5, "note": "x"})], None).unwrap();

    let unified = unify_batches(&[a, b]).unwrap();
    assert_eq!(unified.num_rows(), 2);
    assert_eq!(names(&unified.schema()), vec!["id", "value", "note"]);

    let values = unified
        .column_by_name("value")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(values.value(0), 2.0);
    assert!(unified.column_by_name("note").unwrap().is_null(0));
}

#[test]
fn test_conform_batch_casts_to_string() {
    let batch = json_to_arrow(&[json!({"code": 7})], None).unwrap();
    let target = Arc::new(Schema::new(vec![Field::new("code", DataType::Utf8, true)]));
    let conformed = conform_batch(&batch, &target).unwrap();
    let codes = conformed
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(codes.value(0), "7");
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test]
fn test_encode_parquet_uses_snappy() {
    use parquet::basic::Compression;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    let batch = weather_batch(&[("2024-01-01 00:00:00", 40.0), ("2024-01-01 01:00:00", 41.0)]);
    let bytes = encode_parquet(&batch, &ParquetWriterConfig::new()).unwrap();

    let reader = SerializedFileReader::new(bytes).unwrap();
    let row_group = reader.metadata().row_group(0);
    assert_eq!(row_group.num_rows(), 2);
    assert_eq!(row_group.column(0).compression(), Compression::SNAPPY);
}

#[test]
fn test_parquet_round_trip_preserves_timestamps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("videos.parquet");
    let schema = Schema::new(vec![
        Field::new("video_id", DataType::Utf8, false),
        Field::new("published_at", timestamp_type(), false),
    ]);
    let batch = json_to_arrow(
        &[json!({"video_id": "abc", "published_at": "2024-05-05T00:00:00Z"})],
        Some(&schema),
    )
    .unwrap();

    let rows = write_batch(&path, &batch, FileFormat::Parquet, &ParquetWriterConfig::default())
        .unwrap();
    assert_eq!(rows, 1);

    let read = read_batch(&path, FileFormat::Parquet).unwrap();
    assert_eq!(read.num_rows(), 1);
    assert_eq!(read.schema().field(1).data_type(), &timestamp_type());
    assert_eq!(read.column(1).as_ref(), batch.column(1).as_ref());
}

#[test]
fn test_csv_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("weather.csv");
    let batch = weather_batch(&[("2024-01-01 00:00:00", 32.5), ("2024-01-01 01:00:00", 33.0)]);

    write_batch(&path, &batch, FileFormat::Csv, &ParquetWriterConfig::default()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("request_datetime,city_name,temp_fahrenheit\n"));

    let read = read_batch(&path, FileFormat::Csv).unwrap();
    assert_eq!(read.num_rows(), 2);
    assert_eq!(names(&read.schema()), names(&batch.schema()));
}

#[test]
fn test_csv_to_arrow_header_only_keeps_columns() {
    let batch = csv_to_arrow("_id,name,count\n").unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(names(&batch.schema()), vec!["_id", "name", "count"]);
    assert_eq!(batch.schema().field(2).data_type(), &DataType::Utf8);

    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Csv).unwrap();
    let path = sink.write(&batch, "shelter").unwrap();
    let read = read_batch(&path, FileFormat::Csv).unwrap();
    assert_eq!(read.num_columns(), 3);
    assert_eq!(read.num_rows(), 0);
}

#[test]
fn test_csv_to_arrow_infers_types() {
    let batch = csv_to_arrow("_id,name\n1,Men\n2,Women\n").unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
    assert_eq!(csv_to_arrow("").unwrap().num_columns(), 0);
}

#[test]
fn test_encode_parquet_in_memory() {
    let batch = weather_batch(&[("2024-01-01 00:00:00", 40.0)]);
    let bytes = encode_parquet(&batch, &ParquetWriterConfig::default()).unwrap();
    assert_eq!(&bytes[..4], b"PAR1");
}

#[test]
fn test_parquet_writer_rows_written() {
    let batch = weather_batch(&[("2024-01-01 00:00:00", 40.0)]);
    let mut writer =
        ParquetWriter::new(Vec::new(), batch.schema().as_ref(), &ParquetWriterConfig::new())
            .unwrap();
    writer.write(&batch).unwrap();
    writer.write(&batch).unwrap();
    assert_eq!(writer.rows_written(), 2);
    let (_, rows) = writer.finish().unwrap();
    assert_eq!(rows, 2);
}

// ============================================================================
// Sink Tests
// ============================================================================

#[test]
fn test_sink_file_name_parse_and_render() {
    let parsed = SinkFileName::parse("open_weather_data", "open_weather_data_2024-02-03_04.05.06.csv")
        .unwrap();
    assert_eq!(parsed.seq, 0);
    assert_eq!(parsed.format, FileFormat::Csv);
    assert_eq!(parsed.render(), "open_weather_data_2024-02-03_04.05.06.csv");

    let seq = SinkFileName::parse("videos", "videos_2024-02-03_04.05.06-2.parquet").unwrap();
    assert_eq!(seq.seq, 2);
    assert_eq!(seq.render(), "videos_2024-02-03_04.05.06-2.parquet");
}

#[test]
fn test_sink_file_name_rejects_other_files() {
    for name in [
        "videos_combined.parquet",
        "videos_2024-02-03_04.05.06.json",
        "videos_2024-13-03_04.05.06.parquet",
        "videos_2024-02-03_04.05.06-.parquet",
        "videos_2024-02-03_04.05.06x.parquet",
        "videos_daily_2024-02-03_04.05.06.parquet",
        "other_2024-02-03_04.05.06.parquet",
        ".videos_2024-02-03_04.05.06.parquet.1-0.tmp",
    ] {
        assert_eq!(SinkFileName::parse("videos", name), None, "{name}");
    }
}

#[test]
fn test_sink_same_second_writes_get_distinct_names() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Parquet).unwrap();
    let batch = weather_batch(&[("2024-01-01 00:00:00", 40.0)]);
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();

    let first = sink.write_at(&batch, "videos", at).unwrap();
    let second = sink.write_at(&batch, "videos", at).unwrap();
    let third = sink.write(&batch, "videos").unwrap();

    assert_ne!(first, second);
    assert_eq!(
        first.file_name().unwrap().to_str().unwrap(),
        "videos_2024-06-01_08.30.00.parquet"
    );
    assert_eq!(
        second.file_name().unwrap().to_str().unwrap(),
        "videos_2024-06-01_08.30.00-1.parquet"
    );
    assert_ne!(third, first);

    // No temporary files are left behind
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 3);
}

#[test]
fn test_sink_latest_uses_name_timestamp_not_mtime() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Csv).unwrap();
    let batch = weather_batch(&[("2024-01-01 00:00:00", 40.0)]);

    let newer = sink
        .write_at(&batch, "weather", Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap())
        .unwrap();
    // Written later, but named earlier
    let older = sink
        .write_at(&batch, "weather", Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        .unwrap();
    std::fs::write(dir.path().join("weather_combined.csv"), "x\n1\n").unwrap();

    assert_eq!(sink.latest("weather").unwrap(), Some(newer.clone()));
    assert_eq!(sink.list("weather").unwrap(), vec![older, newer]);
    assert_eq!(sink.latest("videos").unwrap(), None);
}

#[test]
fn test_sink_rejects_bad_prefix() {
    let dir = tempdir().unwrap();
    let sink = FileSink::new(dir.path(), FileFormat::Csv).unwrap();
    let batch = weather_batch(&[("2024-01-01 00:00:00", 40.0)]);

    for prefix in ["", "../escape", ".hidden"] {
        let err = sink.write(&batch, prefix).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }
}

#[test]
fn test_list_sink_files_missing_dir() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope");
    let err = list_sink_files(&missing, "weather", FileFormat::Csv).unwrap_err();
    assert!(matches!(err, Error::DirectoryNotFound { .. }));
}

#[test]
fn test_combined_file_name() {
    assert_eq!(
        combined_file_name("open_weather_data", FileFormat::Csv),
        "open_weather_data_combined.csv"
    );
}
