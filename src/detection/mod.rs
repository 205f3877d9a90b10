//! # Table Detection Module
//!
//! Finds tables in a sheet from geometry alone, in two forward passes:
//!
//! 1. [`RegionDetector`] groups connected non-empty cells into candidate boxes.
//! 2. [`TableBuilder`] buffers each candidate, picks its header row, names the
//!    columns and emits keyed rows.
pub(crate) mod builder;
pub(crate) mod detector;
pub(crate) mod model;
pub(crate) mod options;
pub(crate) mod union_find;

pub use builder::TableBuilder;
pub use detector::RegionDetector;
pub use model::BoundingBox;
pub use model::ExtractedTable;
pub use model::TableCandidate;
pub use options::ExtractOptions;
pub use options::OptionsError;
