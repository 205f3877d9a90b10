use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::position_to_reference;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use std::fmt;

/// Rectangle of cells, 1-based and inclusive on both axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    pub fn new(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_row: min_row.min(max_row),
            min_col: min_col.min(max_col),
            max_row: min_row.max(max_row),
            max_col: min_col.max(max_col),
        }
    }

    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    pub fn contains_row(&self, row: usize) -> bool {
        self.min_row <= row && row <= self.max_row
    }

    /// Grows the box to cover a horizontal run of cells.
    pub(crate) fn include(&mut self, row: usize, start_col: usize, end_col: usize) {
        self.min_row = self.min_row.min(row);
        self.max_row = self.max_row.max(row);
        self.min_col = self.min_col.min(start_col);
        self.max_col = self.max_col.max(end_col);
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_row: self.min_row.min(other.min_row),
            min_col: self.min_col.min(other.min_col),
            max_row: self.max_row.max(other.max_row),
            max_col: self.max_col.max(other.max_col),
        }
    }
}

/// A1-style range such as `B2:D7`.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            position_to_reference(self.min_row, self.min_col),
            position_to_reference(self.max_row, self.max_col)
        )
    }
}

/// A region of connected non-empty cells that may hold one logical table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCandidate {
    /// Position of the candidate in its sheet, top to bottom then left to right
    pub id: usize,
    pub sheet_name: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub metadata: Map<String, Value>,
}

/// A table recovered from a candidate region: header-derived columns and keyed rows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractedTable {
    /// `Sheet!A1:C6` style identifier
    pub table_id: String,
    pub sheet_name: String,
    pub bbox: BoundingBox,
    /// Unique column names in sheet order
    pub columns: Vec<String>,
    pub rows: Vec<IndexMap<String, CellValue>>,
    /// Always carries `header_row_relative_index` and `header_score`
    pub metadata: Map<String, Value>,
}

impl ExtractedTable {
    /// Zero-based offset of the header row inside the table's bounding box.
    pub fn header_row_relative_index(&self) -> Option<usize> {
        self.metadata
            .get("header_row_relative_index")
            .and_then(Value::as_u64)
            .map(|index| index as usize)
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        if !self.columns.iter().any(|column| column == name) {
            return None;
        }
        Some(self.rows.iter().filter_map(|row| row.get(name)).collect())
    }
}
