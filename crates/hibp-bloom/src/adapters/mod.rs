//! Adapters Layer
//!
//! Connections to the outside world:
//! - `line_source`: streaming passes over the input file
//! - `filter_file`: binary filter file codec (implements `FilterStore`)

pub mod filter_file;
pub mod line_source;

pub use filter_file::{FilterFileStore, FilterHeader, FILTER_MAGIC, FORMAT_VERSION};
pub use line_source::{count_lines, LineCount, RecordReader};
