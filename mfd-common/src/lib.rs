//! # MFD Common Library
//!
//! Shared code for the marine field data services including:
//! - Error type shared by every crate
//! - Configuration loading and root folder resolution
//! - Timestamp parsing and display formatting
//! - Data model for occurrence records, sample points and stored files

pub mod config;
pub mod error;
pub mod model;
pub mod time;

pub use error::{Error, Result};
pub use model::{
    Confidence, DataPoint, FileMetadata, LineageEntry, OccurrenceRecord, Rank, SampleValue,
    TaxonomyResolution, TaxonomySource,
};
