//! Decoder implementations

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use serde_json::{Map, Value};

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Path to the record array, dot notation or JSONPath
    record_path: Option<String>,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
        }
    }

    /// Extract records from an already parsed body
    pub fn extract_records(&self, value: &Value) -> Result<Vec<Value>> {
        match &self.record_path {
            // Wildcards and filters go through jsonpath-rust, plain paths are walked
            Some(path) if path.contains('*') || path.contains('?') => {
                extract_with_jsonpath(value, path)
            }
            Some(path) => match extract_simple_path(value, path) {
                Some(Value::Array(arr)) => Ok(arr),
                Some(Value::Null) | None => Ok(vec![]),
                Some(v) => Ok(vec![v]),
            },
            None => match value {
                Value::Array(arr) => Ok(arr.clone()),
                _ => Ok(vec![value.clone()]),
            },
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        let value = self.decode_raw(body)?;
        self.extract_records(&value)
    }

    fn decode_raw(&self, body: &str) -> Result<Value> {
        serde_json::from_str(body).map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder with configurable delimiter and header handling
///
/// Quoted fields may contain delimiters, doubled quotes and line breaks.
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: char,
    has_header: bool,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

impl CsvDecoder {
    /// Create a new CSV decoder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with custom settings
    pub fn with_options(delimiter: char, has_header: bool) -> Self {
        Self {
            delimiter,
            has_header,
        }
    }

    /// Decode into header names and raw string rows, without type inference
    pub fn decode_rows(&self, body: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let body = body.strip_prefix('\u{feff}').unwrap_or(body);
        let mut rows = split_records(body, self.delimiter)?.into_iter();

        let headers: Vec<String> = if self.has_header {
            match rows.next() {
                Some(header) => header,
                None => return Ok((Vec::new(), Vec::new())),
            }
        } else {
            let rows: Vec<Vec<String>> = rows.collect();
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            let headers = (0..width).map(|i| format!("column_{i}")).collect();
            return Ok((headers, rows));
        };

        let rows = rows
            .enumerate()
            .map(|(i, row)| {
                if row.len() > headers.len() {
                    Err(Error::csv(format!(
                        "row {} has {} fields, header has {}",
                        i + 2,
                        row.len(),
                        headers.len()
                    )))
                } else {
                    Ok(row)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((headers, rows))
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode(&self, body: &str) -> Result<Vec<Value>> {
        let (headers, rows) = self.decode_rows(body)?;

        let records = rows
            .into_iter()
            .map(|row| {
                let mut obj = Map::with_capacity(headers.len());
                for (i, header) in headers.iter().enumerate() {
                    let value = row.get(i).map_or(Value::Null, |v| parse_csv_value(v));
                    obj.insert(header.clone(), value);
                }
                Value::Object(obj)
            })
            .collect();

        Ok(records)
    }

    fn decode_raw(&self, body: &str) -> Result<Value> {
        Ok(Value::Array(self.decode(body)?))
    }
}

/// Split a CSV body into records of fields
///
/// Blank lines outside quotes are skipped. An unterminated quote is an error.
fn split_records(body: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            c if c == delimiter => {
                record.push(std::mem::take(&mut field).trim().to_string());
            }
            '\r' => {}
            '\n' => {
                if !record.is_empty() || !field.trim().is_empty() {
                    record.push(std::mem::take(&mut field).trim().to_string());
                    records.push(std::mem::take(&mut record));
                }
                field.clear();
            }
            c => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::csv("unterminated quoted field"));
    }
    if !record.is_empty() || !field.trim().is_empty() {
        record.push(field.trim().to_string());
        records.push(record);
    }

    Ok(records)
}

/// Parse a CSV value into a JSON scalar
fn parse_csv_value(value: &str) -> Value {
    if value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none")
    {
        return Value::Null;
    }

    // Leading zeros are identifiers (zip codes, ids), not numbers
    let leading_zero = value.len() > 1 && value.starts_with('0') && !value.starts_with("0.");
    if !leading_zero {
        if let Ok(n) = value.parse::<i64>() {
            return Value::Number(n.into());
        }
        if let Ok(n) = value.parse::<f64>() {
            if let Some(num) = serde_json::Number::from_f64(n) {
                return Value::Number(num);
            }
        }
    }

    match value.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extract a value using simple dot-notation path, with `name[i]` indexing
fn extract_simple_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].trim_end_matches(']');

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            let arr = current.as_array()?;
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path)
        .map_err(|e| Error::json_path(format!("Invalid JSONPath '{path}': {e}")))?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
