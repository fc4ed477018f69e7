//! Warehouse module
//!
//! Loads record batches into tables. The [`Uploader`] trait is the seam;
//! [`ObjectStoreUploader`] keeps each table as Parquet objects under a key
//! prefix in S3, R2, GCS, Azure or a local directory. Batches are checked
//! against an optional [`TableSchema`] before anything is sent.

mod load;
mod store;
mod types;
mod validate;

pub use load::upload_file;
pub use store::{ObjectStoreUploader, NULL_PARTITION};
pub use types::{ColumnSpec, ScalarKind, TableSchema, UploadAck, UploadOptions, Uploader};
pub use validate::validate_batch;
