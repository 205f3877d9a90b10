use crate::error::TableError;
use crate::spreadsheet::reference::col_to_number;
use crate::spreadsheet::reference::number_to_col;
use crate::spreadsheet::reference::row_to_number;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors related to A1-style range parsing.
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid range format '{0}'")]
    FormatError(String),
}

/// A declared merged-cell rectangle within one sheet.
///
/// Coordinates are 1-based and inclusive; the anchor is `(min_row, min_col)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MergeRange {
    pub min_col: usize,
    pub min_row: usize,
    pub max_col: usize,
    pub max_row: usize,
}

impl MergeRange {
    /// Parses a merge reference such as `B2:D4`, `$B$2:$D$4` or a single cell `C3`.
    /// Corners given in reverse order are normalised.
    pub fn parse(value: &str) -> Result<Self, TableError> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\$?([A-Z]+)\$?(\d+)(:\$?([A-Z]+)\$?(\d+))?$").expect("Hardcode regex pattern")
        });
        let value = value.trim().to_ascii_uppercase();
        let invalid = || RangeError::FormatError(value.to_owned());
        let captures = pattern.captures(value.as_str()).ok_or_else(invalid)?;

        let number = |index: usize, parse: fn(&str) -> Option<usize>| {
            captures.get(index).map(|matcher| matcher.as_str()).and_then(parse)
        };
        let first_col = number(1, col_to_number).ok_or_else(invalid)?;
        let first_row = number(2, row_to_number).ok_or_else(invalid)?;
        let (second_col, second_row) = if captures.get(3).is_some() {
            (
                number(4, col_to_number).ok_or_else(invalid)?,
                number(5, row_to_number).ok_or_else(invalid)?,
            )
        } else {
            (first_col, first_row)
        };

        Ok(MergeRange {
            min_col: first_col.min(second_col),
            min_row: first_row.min(second_row),
            max_col: first_col.max(second_col),
            max_row: first_row.max(second_row),
        })
    }

    /// Checks if the range covers the given position.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.min_row <= row && row <= self.max_row && self.min_col <= col && col <= self.max_col
    }
}

impl fmt::Display for MergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            number_to_col(self.min_col),
            self.min_row,
            number_to_col(self.max_col),
            self.max_row
        )
    }
}
