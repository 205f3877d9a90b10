use crate::detection::model::BoundingBox;
use crate::detection::model::ExtractedTable;
use crate::detection::model::TableCandidate;
use crate::detection::options::ExtractOptions;
use crate::error::TableError;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::source::RowSource;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::OnceLock;

// Header score weights
const FILL_WEIGHT: f64 = 0.4;
const STRING_WEIGHT: f64 = 0.3;
const UNIQUENESS_WEIGHT: f64 = 0.3;

/// Turns candidate regions into tables during a second pass over the sheet.
///
/// Every candidate buffers the slice of each row it spans, then the buffer is split
/// into a header row and data rows.
#[derive(Copy, Clone, Debug)]
pub struct TableBuilder {
    header_search_depth: usize,
}

impl TableBuilder {
    pub fn new(header_search_depth: usize) -> Self {
        Self { header_search_depth }
    }

    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::new(options.header_search_depth)
    }

    /// Consumes the rows of the sheet the candidates were detected on.
    ///
    /// Reading stops after the last row any candidate spans. Candidates that
    /// buffer no rows produce no table.
    pub fn build<S: RowSource>(&self, mut rows: S, mut candidates: Vec<TableCandidate>) -> Result<Vec<ExtractedTable>, TableError> {
        candidates.sort_by_key(|candidate| (candidate.bbox.min_row, candidate.bbox.min_col));
        let Some(last_row) = candidates.iter().map(|candidate| candidate.bbox.max_row).max() else {
            return Ok(Vec::new());
        };

        let mut buffers: Vec<Vec<Vec<CellValue>>> = vec![Vec::new(); candidates.len()];
        let mut active: Vec<usize> = Vec::new();
        let mut next = 0;
        while let Some(row) = rows.next_row()? {
            if row.index > last_row {
                break;
            }
            active.retain(|&index| candidates[index].bbox.contains_row(row.index));
            while next < candidates.len() && candidates[next].bbox.min_row <= row.index {
                if candidates[next].bbox.contains_row(row.index) {
                    active.push(next);
                }
                next += 1;
            }
            for &index in &active {
                buffers[index].push(slice_row(&row.values, &candidates[index].bbox));
            }
        }

        let mut tables = Vec::with_capacity(candidates.len());
        for (candidate, buffer) in candidates.into_iter().zip(buffers) {
            if buffer.is_empty() {
                debug!("Candidate {}!{} buffered no rows", candidate.sheet_name, candidate.bbox);
                continue;
            }
            tables.push(self.build_table(candidate, buffer));
        }
        Ok(tables)
    }

    fn build_table(&self, candidate: TableCandidate, buffer: Vec<Vec<CellValue>>) -> ExtractedTable {
        let (header_index, header_score) = self.detect_header(&buffer);
        let names = normalize_columns(&buffer[header_index]);
        let data = &buffer[header_index + 1..];
        let kept = retained_columns(&names, data);
        debug!(
            "Candidate {}!{}: header at {} (score {:.3}), {} data rows, {} of {} columns kept",
            candidate.sheet_name,
            candidate.bbox,
            header_index,
            header_score,
            data.len(),
            kept.len(),
            names.len()
        );

        let rows = data
            .iter()
            .map(|row| {
                kept.iter()
                    .map(|&index| (names[index].to_owned(), row.get(index).cloned().unwrap_or_default()))
                    .collect::<IndexMap<_, _>>()
            })
            .collect();
        let columns = kept.iter().map(|&index| names[index].to_owned()).collect();

        let mut metadata = candidate.metadata;
        metadata.insert("header_row_relative_index".to_owned(), Value::from(header_index));
        metadata.insert("header_score".to_owned(), Value::from(header_score));

        ExtractedTable {
            table_id: format!("{}!{}", candidate.sheet_name, candidate.bbox),
            sheet_name: candidate.sheet_name,
            bbox: candidate.bbox,
            columns,
            rows,
            metadata,
        }
    }

    /// Index and score of the best header among the leading rows; ties keep the earlier row.
    fn detect_header(&self, rows: &[Vec<CellValue>]) -> (usize, f64) {
        let mut best = (0, -1.0);
        for (index, row) in rows.iter().take(self.header_search_depth).enumerate() {
            let score = header_score(row);
            if score > best.1 {
                best = (index, score);
            }
        }
        (best.0, best.1.max(0.0))
    }
}

/// Candidate's column slice of a row, padded with empty cells to the candidate width
fn slice_row(values: &[CellValue], bbox: &BoundingBox) -> Vec<CellValue> {
    let mut slice: Vec<CellValue> = values
        .iter()
        .skip(bbox.min_col.saturating_sub(1))
        .take(bbox.width())
        .cloned()
        .collect();
    slice.resize(bbox.width(), CellValue::Empty);
    slice
}

/// How much a row looks like a header: filled, textual and without repeats.
pub(crate) fn header_score(row: &[CellValue]) -> f64 {
    let mut non_empty = 0usize;
    let mut strings = 0usize;
    let mut distinct = HashSet::new();
    for cell in row.iter().filter(|cell| !cell.is_empty()) {
        non_empty += 1;
        if cell.is_text() {
            strings += 1;
        }
        distinct.insert(cell.trimmed());
    }
    if non_empty == 0 {
        return 0.0;
    }
    let non_empty_rate = non_empty as f64;
    FILL_WEIGHT * non_empty_rate / row.len() as f64
        + STRING_WEIGHT * strings as f64 / non_empty_rate
        + UNIQUENESS_WEIGHT * distinct.len() as f64 / non_empty_rate
}

/// Column names from a header row: blanks become `Column_<n>`, repeats get `_<n>` suffixes.
pub(crate) fn normalize_columns(header: &[CellValue]) -> Vec<String> {
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(header.len());
    for (index, cell) in header.iter().enumerate() {
        let base = if cell.is_empty() {
            format!("Column_{}", index + 1)
        } else {
            cell.trimmed()
        };
        let count = occurrences.entry(base.to_owned()).or_insert(0);
        *count += 1;
        let mut name = if *count == 1 { base } else { format!("{}_{}", base, count) };
        while used.contains(&name) {
            name.push_str("_2");
        }
        used.insert(name.to_owned());
        names.push(name);
    }
    names
}

/// Indices of the columns to keep: a column goes only when it is empty in every
/// data row and its name is a generated placeholder or blank.
pub(crate) fn retained_columns(names: &[String], data: &[Vec<CellValue>]) -> Vec<usize> {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder = PLACEHOLDER.get_or_init(|| Regex::new(r"^Column_\d+$").expect("Hardcode regex pattern"));
    (0..names.len())
        .filter(|&index| {
            let name = &names[index];
            data.is_empty()
                || !(name.trim().is_empty() || placeholder.is_match(name))
                || data.iter().any(|row| row.get(index).is_some_and(|value| !value.is_empty()))
        })
        .collect()
}
