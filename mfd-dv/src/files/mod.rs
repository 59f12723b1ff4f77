//! Uploaded file handling: classification, FPOD pairing, date ranges and
//! the CSV adapter feeding the taxonomy and heatmap pipelines

pub mod classifier;
pub mod date_range;
pub mod fpod;
pub mod tabular;

pub use classifier::{classify, classify_file, device_type, Classification, DeviceType, FileTag};
pub use date_range::{analyze_table, is_discrete_file, DateRangeAnalyzer, DateRangeResult};
pub use fpod::{
    create_paired_timeline_entries, get_fpod_base_name, pair_fpod_files, FpodFilePair,
    FpodPairing, NamedFile, TimelineEntry,
};
pub use tabular::Table;
