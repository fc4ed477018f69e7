//! Batch validation against a table schema

use super::types::TableSchema;
use crate::error::{Error, Result};
use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use tracing::debug;

/// Check `batch` against `schema`
///
/// Reports the first problem in schema column order: a missing column, a
/// column whose type does not fit the declared kind, or nulls in a column
/// declared not nullable. Columns the schema does not mention are allowed.
pub fn validate_batch(batch: &RecordBatch, schema: &TableSchema) -> Result<()> {
    for spec in &schema.columns {
        let column = batch
            .column_by_name(&spec.name)
            .ok_or_else(|| Error::missing_column(&spec.name))?;

        if !spec.kind.accepts(column.data_type()) {
            return Err(Error::ColumnType {
                column: spec.name.clone(),
                expected: spec.kind.to_string(),
                found: column.data_type().to_string(),
            });
        }

        let nulls = column.logical_nulls().map_or(0, |n| n.null_count());
        if !spec.nullable && nulls > 0 {
            return Err(Error::NullInRequiredColumn {
                column: spec.name.clone(),
                nulls,
            });
        }
    }

    let extra = batch
        .schema()
        .fields()
        .iter()
        .filter(|f| !schema.columns.iter().any(|c| &c.name == f.name()))
        .count();
    if extra > 0 {
        debug!("{} column(s) not declared in the table schema", extra);
    }

    Ok(())
}
