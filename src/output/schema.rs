//! Arrow schema inference and JSON to Arrow conversion
//!
//! Columns keep the order in which they first appear in the records, so the
//! same input always yields the same schema and the same file bytes.

use crate::error::{Error, Result};
use arrow::array::{
    new_null_array, ArrayRef, BooleanArray, Float64Array, Int64Array, NullArray, StringArray,
    TimestampMicrosecondArray,
};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// The timestamp type used for every time column: microseconds, UTC
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Infer an Arrow schema from a set of JSON records
///
/// Every field is nullable. Nested arrays and objects become strings.
pub fn infer_schema(records: &[Value]) -> Schema {
    let mut fields: Vec<(String, DataType)> = Vec::new();

    for record in records {
        let Value::Object(obj) = record else {
            continue;
        };
        for (key, value) in obj {
            let inferred = infer_type(value);
            match fields.iter_mut().find(|(name, _)| name == key) {
                Some((_, existing)) => *existing = merge_types(existing, &inferred),
                None => fields.push((key.clone(), inferred)),
            }
        }
    }

    Schema::new(
        fields
            .into_iter()
            .map(|(name, dtype)| Field::new(name, dtype, true))
            .collect::<Vec<_>>(),
    )
}

/// Merge two schemas, combining fields from both
///
/// Fields of `schema1` come first in their order, then fields only present
/// in `schema2`. Shared fields get the widened type of both.
pub fn merge_schemas(schema1: &Schema, schema2: &Schema) -> Schema {
    let mut fields: Vec<Field> = schema1
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();

    for field in schema2.fields() {
        match fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => {
                let merged = merge_types(existing.data_type(), field.data_type());
                *existing = Field::new(
                    existing.name(),
                    merged,
                    existing.is_nullable() || field.is_nullable(),
                );
            }
            None => fields.push(field.as_ref().clone().with_nullable(true)),
        }
    }

    Schema::new(fields)
}

/// Merge two data types into a compatible type
///
/// Nulls take the other side, integers and floats widen to float, anything
/// else that disagrees widens to string.
pub fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}

/// Convert JSON records to an Arrow RecordBatch
///
/// Uses the provided schema or infers one from the data. With an explicit
/// schema, timestamp columns accept RFC 3339 / `%Y-%m-%d %H:%M:%S` strings or
/// integer microseconds.
pub fn json_to_arrow(records: &[Value], schema: Option<&Schema>) -> Result<RecordBatch> {
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => infer_schema(records),
    };
    let schema = Arc::new(schema);

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|record| match record {
                Value::Object(obj) => obj.get(field.name()).filter(|v| !v.is_null()),
                _ => None,
            })
            .collect();

        columns.push(build_array(field.name(), &values, field.data_type())?);
    }

    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to create RecordBatch: {e}")))
}

/// Cast string columns holding date-times into the timestamp type
///
/// Columns not present in the batch are ignored; unparseable values are an error.
pub fn coerce_timestamps(batch: &RecordBatch, columns: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut arrays = Vec::with_capacity(schema.fields().len());

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        if columns.contains(&field.name().as_str()) && field.data_type() == &DataType::Utf8 {
            let strings = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::output("Failed to downcast to StringArray"))?;
            let micros = strings
                .iter()
                .map(|v| v.map(|s| parse_timestamp_micros(field.name(), s)).transpose())
                .collect::<Result<Vec<_>>>()?;
            let ts = TimestampMicrosecondArray::from(micros).with_timezone("UTC");
            fields.push(Field::new(field.name(), timestamp_type(), field.is_nullable()));
            arrays.push(Arc::new(ts) as ArrayRef);
        } else {
            fields.push(field.as_ref().clone());
            arrays.push(Arc::clone(array));
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Reshape a batch to `target`: reorder, cast, and null-fill missing columns
pub fn conform_batch(batch: &RecordBatch, target: &SchemaRef) -> Result<RecordBatch> {
    let mut columns = Vec::with_capacity(target.fields().len());
    for field in target.fields() {
        let column = match batch.column_by_name(field.name()) {
            Some(array) if array.data_type() == field.data_type() => Arc::clone(array),
            Some(array) => cast(array, field.data_type())?,
            None => new_null_array(field.data_type(), batch.num_rows()),
        };
        columns.push(column);
    }
    Ok(RecordBatch::try_new(Arc::clone(target), columns)?)
}

/// Unify several batches into one under the merged schema of all of them
pub fn unify_batches(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let Some(first) = batches.first() else {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    };

    let merged = batches
        .iter()
        .skip(1)
        .fold(first.schema().as_ref().clone(), |acc, b| {
            merge_schemas(&acc, &b.schema())
        });
    let merged: SchemaRef = Arc::new(merged);

    let conformed = batches
        .iter()
        .map(|b| conform_batch(b, &merged))
        .collect::<Result<Vec<_>>>()?;

    Ok(concat_batches(&merged, &conformed)?)
}

/// Parse the date-time shapes the upstream APIs produce
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_timestamp_micros(column: &str, value: &str) -> Result<i64> {
    parse_timestamp(value)
        .map(|dt| dt.timestamp_micros())
        .ok_or_else(|| Error::decode(format!("Column '{column}': '{value}' is not a timestamp")))
}

/// Infer Arrow DataType from a JSON value
fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() => DataType::Int64,
        Value::Number(_) => DataType::Float64,
        Value::String(_) | Value::Array(_) | Value::Object(_) => DataType::Utf8,
    }
}

/// Build an Arrow array from JSON values
fn build_array(column: &str, values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Null => Ok(Arc::new(NullArray::new(values.len()))),

        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values.iter().map(|v| v.and_then(Value::as_f64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Timestamp(TimeUnit::Microsecond, tz) => {
            let micros = values
                .iter()
                .map(|v| match v {
                    None => Ok(None),
                    Some(Value::String(s)) => parse_timestamp_micros(column, s).map(Some),
                    Some(Value::Number(n)) => Ok(n.as_i64()),
                    Some(other) => Err(Error::decode(format!(
                        "Column '{column}': {other} is not a timestamp"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            let arr = TimestampMicrosecondArray::from(micros);
            Ok(match tz {
                Some(tz) => Arc::new(arr.with_timezone(tz.as_ref())),
                None => Arc::new(arr),
            })
        }

        DataType::Utf8 => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        other => Err(Error::output(format!(
            "Column '{column}': unsupported type {other}"
        ))),
    }
}
