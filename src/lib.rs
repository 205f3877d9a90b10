//! # Rusty Tables
//!
//! Recovers tables from spreadsheet sheets that carry no table markup: several tables
//! per sheet, merged cells, headers that do not sit on the first row.
//!
//! ## Features
//!
//! - **Streaming**: worksheet parts are read row by row straight from the `.xlsx`
//!   archive, so memory follows the tables found rather than the sheet size
//! - **Merged cells**: every position covered by a merge reports the anchor value
//! - **Region detection**: connected non-empty cells are grouped with a disjoint-set
//!   forest in one pass
//! - **Header detection**: the header row is scored on fill, text and uniqueness
//!   among the first rows of each region
//! - **Column names**: blanks are named `Column_<n>`, repeats are suffixed, and
//!   unnamed columns without data are pruned
//!
//! ## Usage
//!
//! ```no_run
//! use rusty_tables::{extract_tables, ExtractOptions};
//!
//! let options = ExtractOptions::default().with_sheets(["Sales*"]);
//! for table in extract_tables("report.xlsx", &options)? {
//!     println!("{}: {:?}", table.table_id, table.columns);
//! }
//! # Ok::<(), rusty_tables::TableError>(())
//! ```
mod detection;
mod error;
mod extractor;
mod helpers;
mod spreadsheet;

pub use detection::BoundingBox;
pub use detection::ExtractOptions;
pub use detection::ExtractedTable;
pub use detection::OptionsError;
pub use detection::RegionDetector;
pub use detection::TableBuilder;
pub use detection::TableCandidate;
pub use error::TableError;
pub use extractor::extract_tables;
pub use extractor::TableExtractor;
pub use helpers::reader::PackageSource;
pub use helpers::xml::XmlError;
pub use spreadsheet::CellValue;
pub use spreadsheet::MemoryRows;
pub use spreadsheet::MergeRange;
pub use spreadsheet::MergeResolver;
pub use spreadsheet::MergedRows;
pub use spreadsheet::RangeError;
pub use spreadsheet::Row;
pub use spreadsheet::RowSource;
pub use spreadsheet::SheetReader;
pub use spreadsheet::SpreadsheetError;
