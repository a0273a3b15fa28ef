// File I/O for datasets: CSV loading, cleaned-dataset persistence,
// and auxiliary series discovery.

pub mod csv;
pub mod discover;
pub mod sink;

pub use crate::csv::{load_dataset, load_dataset_from_str, load_dataset_with, write_dataset};
pub use discover::discover_auxiliary;
pub use sink::{output_file_name, CsvSink};
