//! Warehouse types

use crate::error::Result;
use crate::types::WriteMode;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Scalar kind of a warehouse column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    #[serde(alias = "STRING")]
    String,
    #[serde(alias = "INTEGER", alias = "INT64", alias = "int")]
    Integer,
    #[serde(alias = "FLOAT", alias = "FLOAT64", alias = "double")]
    Float,
    #[serde(alias = "BOOLEAN", alias = "BOOL", alias = "bool")]
    Boolean,
    #[serde(alias = "TIMESTAMP", alias = "datetime")]
    Timestamp,
}

impl ScalarKind {
    /// Whether an Arrow column of `data_type` can be loaded as this kind
    ///
    /// Integers are accepted for `Float`; an all-null column matches any kind.
    pub fn accepts(self, data_type: &DataType) -> bool {
        if data_type == &DataType::Null {
            return true;
        }
        match self {
            ScalarKind::String => matches!(data_type, DataType::Utf8 | DataType::LargeUtf8),
            ScalarKind::Integer => data_type.is_integer(),
            ScalarKind::Float => data_type.is_floating() || data_type.is_integer(),
            ScalarKind::Boolean => data_type == &DataType::Boolean,
            ScalarKind::Timestamp => matches!(
                data_type,
                DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64
            ),
        }
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// One column of a [`TableSchema`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ScalarKind,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    /// Nullable column
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }

    /// Column that must not contain nulls
    pub fn required(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            nullable: false,
            ..Self::new(name, kind)
        }
    }
}

/// Expected shape of a warehouse table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSpec>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Load a schema from a YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Options for one upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Append next to existing data, or replace it
    pub mode: WriteMode,
    /// Validate the batch against this schema before uploading
    pub schema: Option<TableSchema>,
    /// Split objects by the values of this column
    pub partition_column: Option<String>,
}

impl UploadOptions {
    #[must_use]
    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn partition_by(mut self, column: impl Into<String>) -> Self {
        self.partition_column = Some(column.into());
        self
    }
}

/// Acknowledgement of a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAck {
    pub table_id: String,
    pub mode: WriteMode,
    /// Objects written, in write order
    pub objects: Vec<String>,
    /// Objects removed by an overwrite
    pub replaced: usize,
    pub rows: usize,
}

/// Loads record batches into warehouse tables
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `batch` to `table_id`
    ///
    /// Schema problems are reported before anything is sent.
    async fn upload(
        &self,
        batch: &RecordBatch,
        table_id: &str,
        options: &UploadOptions,
    ) -> Result<UploadAck>;
}
