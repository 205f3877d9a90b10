use crate::error::TableError;
use crate::spreadsheet::cell::CellValue;
use std::vec::IntoIter;

/// One physical row of a sheet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    /// Row number (1-based)
    pub index: usize,
    /// Dense values starting at column 1; trailing empty cells may be absent
    pub values: Vec<CellValue>,
}

impl Row {
    pub fn new(index: usize, values: Vec<CellValue>) -> Self {
        Self { index, values }
    }
}

/// Forward-only, value-only row iteration over one sheet.
///
/// A source can be consumed exactly once; reading the sheet again requires a new source.
pub trait RowSource {
    /// Returns the next row, or `None` once the sheet is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>, TableError>;
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn next_row(&mut self) -> Result<Option<Row>, TableError> {
        (**self).next_row()
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn next_row(&mut self) -> Result<Option<Row>, TableError> {
        (**self).next_row()
    }
}

/// Rows already held in memory, numbered from 1.
pub struct MemoryRows {
    rows: IntoIter<Vec<CellValue>>,
    index: usize,
}

impl MemoryRows {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            rows: rows.into_iter(),
            index: 0,
        }
    }
}

impl RowSource for MemoryRows {
    fn next_row(&mut self) -> Result<Option<Row>, TableError> {
        Ok(self.rows.next().map(|values| {
            self.index += 1;
            Row::new(self.index, values)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_rows_are_numbered_from_one() {
        let mut rows = MemoryRows::new(vec![vec!["a".into()], vec![], vec![CellValue::Number(1.0)]]);
        assert_eq!(rows.next_row().unwrap().map(|row| row.index), Some(1));
        assert_eq!(rows.next_row().unwrap(), Some(Row::new(2, vec![])));
        assert_eq!(rows.next_row().unwrap().map(|row| row.index), Some(3));
        assert_eq!(rows.next_row().unwrap(), None);
        assert_eq!(rows.next_row().unwrap(), None);
    }
}
