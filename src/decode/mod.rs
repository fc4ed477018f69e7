//! Response decoder module
//!
//! Turns JSON and CSV response bodies into JSON records.

mod decoders;
mod types;

pub use decoders::{CsvDecoder, JsonDecoder};
pub use types::{DecoderFormat, RecordDecoder};
