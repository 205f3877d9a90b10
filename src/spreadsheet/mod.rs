//! # Spreadsheet Access Module
//!
//! Reads Office Open XML spreadsheet packages (`.xlsx`, `.xlsm`, `.xlam`) one row at a
//! time. Worksheet parts are streamed through the ZIP archive, never loaded as a whole,
//! and merged-cell declarations are resolved separately so that every position covered
//! by a merge reports the anchor value.
pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod merges;
pub(crate) mod range;
pub(crate) mod reader;
pub(crate) mod reference;
pub(crate) mod source;
pub(crate) mod xlsx;

use thiserror::Error;

pub use cell::CellValue;
pub use merges::MergeResolver;
pub use range::MergeRange;
pub use range::RangeError;
pub use reader::MergedRows;
pub use reader::SheetReader;
pub use source::MemoryRows;
pub use source::Row;
pub use source::RowSource;

/// Errors raised while locating and opening worksheets.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// Requested sheet is not declared, or its part cannot be resolved
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    /// Sheet rows were already streamed by this reader
    #[error("Sheet '{0}' was already consumed by this reader")]
    SheetConsumed(String),

    /// A structural part of the package is absent
    #[error("Missing package part '{0}'")]
    MissingPart(String),

    /// Container is an OLE compound file rather than a ZIP package
    #[error("Unsupported container for '{0}': encrypted or legacy binary workbook")]
    UnsupportedContainer(String),

    /// Workbook declares no worksheets
    #[error("Workbook '{0}' contains no sheets")]
    EmptyWorkbook(String),
}
