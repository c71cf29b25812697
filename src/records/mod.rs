//! Record decoding.
//!
//! Each category log is newline-delimited JSON, one event per line. The
//! decoder turns it into typed records and stops at the first malformed
//! line.

mod decoder;

pub use decoder::{decode_line, RecordDecoder};
