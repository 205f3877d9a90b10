use crate::error::ResultMessage;
use crate::error::TableError;
use crate::helpers::reader::PackageSource;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::merges::MergeResolver;
use crate::spreadsheet::range::MergeRange;
use crate::spreadsheet::source::Row;
use crate::spreadsheet::source::RowSource;
use crate::spreadsheet::xlsx::XlsxRows;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

/// Row source that reports the anchor value at every position covered by a merge.
///
/// Ranges become active on their top row and are retired after their bottom row,
/// so only the ranges crossing the current row are held, each with its cached anchor.
pub struct MergedRows<S> {
    rows: S,
    /// Ranges sorted by top row
    ranges: Vec<MergeRange>,
    /// First range not yet activated
    next_range: usize,
    /// Ranges crossing the current row with their anchor value
    active: Vec<(MergeRange, CellValue)>,
}

impl<S: RowSource> MergedRows<S> {
    pub fn new(rows: S, ranges: impl Into<Vec<MergeRange>>) -> Self {
        let mut ranges = ranges.into();
        ranges.sort_by_key(|range| (range.min_row, range.min_col));
        Self {
            rows,
            ranges,
            next_range: 0,
            active: Vec::new(),
        }
    }

    /// Number of ranges currently held with their anchor value.
    pub fn active_ranges(&self) -> usize {
        self.active.len()
    }
}

impl<S: RowSource> RowSource for MergedRows<S> {
    fn next_row(&mut self) -> Result<Option<Row>, TableError> {
        let Some(mut row) = self.rows.next_row()? else {
            self.active.clear();
            return Ok(None);
        };

        self.active.retain(|(range, _)| range.max_row >= row.index);
        while let Some(range) = self.ranges.get(self.next_range) {
            if range.min_row > row.index {
                break;
            }
            self.next_range += 1;
            if range.max_row < row.index {
                continue;
            }
            let anchor = if range.min_row == row.index {
                row.values.get(range.min_col.saturating_sub(1)).cloned().unwrap_or_default()
            } else {
                debug!("Anchor row of merge {} was never read", range);
                CellValue::Empty
            };
            self.active.push((*range, anchor));
        }

        for (range, anchor) in &self.active {
            if row.values.len() < range.max_col {
                row.values.resize(range.max_col, CellValue::Empty);
            }
            for cell in &mut row.values[range.min_col.saturating_sub(1)..range.max_col] {
                cell.clone_from(anchor);
            }
        }
        Ok(Some(row))
    }
}

/// One connection to a spreadsheet package.
///
/// Each sheet can be streamed once per reader; a second pass needs a new reader,
/// which may share the memoised merges of the first one.
pub struct SheetReader {
    workbook: XlsxWorkbook,
    merges: Arc<MergeResolver>,
    consumed: HashSet<String>,
}

impl SheetReader {
    /// Opens a package with its own merge resolver.
    pub fn open(source: impl Into<PackageSource>) -> Result<Self, TableError> {
        Self::with_merges(Arc::new(MergeResolver::new(source.into())))
    }

    /// Opens a fresh connection to the package of an existing merge resolver.
    pub fn with_merges(merges: Arc<MergeResolver>) -> Result<Self, TableError> {
        let source = merges.source();
        let workbook = XlsxWorkbook::open(source).with_prefix(&source.name())?;
        Ok(Self {
            workbook,
            merges,
            consumed: HashSet::new(),
        })
    }

    /// Declared sheet names in workbook order, chart sheets included.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// Names of the sheets that have rows to stream, in workbook order.
    pub fn worksheet_names(&self) -> Vec<String> {
        self.workbook.worksheet_names()
    }

    /// Merge resolver shared by the readers of this package.
    pub fn merges(&self) -> &Arc<MergeResolver> {
        &self.merges
    }

    /// Starts the single forward pass over a sheet.
    pub fn rows(&mut self, sheet_name: &str) -> Result<MergedRows<XlsxRows<'_>>, TableError> {
        if self.consumed.contains(sheet_name) {
            Err(SpreadsheetError::SheetConsumed(sheet_name.to_owned()))?
        }
        let ranges = self.merges.sheet_merges(sheet_name)?.to_vec();
        let prefix = self.merges.source().name();
        let rows = self.workbook.rows(sheet_name).with_prefix(&prefix)?;
        self.consumed.insert(sheet_name.to_owned());
        debug!("Stream sheet '{}' with {} merge ranges", sheet_name, ranges.len());
        Ok(MergedRows::new(rows, ranges))
    }
}
