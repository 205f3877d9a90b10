use crate::detection::model::BoundingBox;
use crate::detection::model::TableCandidate;
use crate::detection::options::ExtractOptions;
use crate::detection::union_find::DisjointSet;
use crate::error::TableError;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::source::RowSource;
use log::debug;
use serde_json::Map;

/// Confidence assigned to every geometric candidate
const CANDIDATE_CONFIDENCE: f64 = 1.0;

/// A maximal horizontal run of non-empty cells and the component it belongs to
#[derive(Copy, Clone, Debug)]
struct Segment {
    start: usize,
    end: usize,
    component: usize,
}

/// Finds table candidates as 4-connected regions of non-empty cells.
///
/// One forward pass over the rows; only the previous row's segments are kept
/// for adjacency, plus one bounding box per component.
#[derive(Copy, Clone, Debug)]
pub struct RegionDetector {
    min_rows: usize,
    min_cols: usize,
}

impl RegionDetector {
    pub fn new(min_rows: usize, min_cols: usize) -> Self {
        Self { min_rows, min_cols }
    }

    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::new(options.min_rows, options.min_cols)
    }

    /// Consumes the rows of one sheet and returns its candidates sorted by position.
    pub fn detect<S: RowSource>(&self, mut rows: S, sheet_name: &str) -> Result<Vec<TableCandidate>, TableError> {
        let mut sets = DisjointSet::default();
        let mut boxes: Vec<BoundingBox> = Vec::new();
        let mut previous: Vec<Segment> = Vec::new();
        let mut previous_index = 0;

        while let Some(row) = rows.next_row()? {
            if row.index != previous_index + 1 {
                previous.clear();
            }
            let mut current = Vec::new();
            for (start, end) in row_segments(&row.values) {
                let mut component = None;
                for segment in previous.iter().filter(|segment| start <= segment.end && segment.start <= end) {
                    component = Some(match component {
                        Some(root) => sets.union(root, segment.component),
                        None => sets.find(segment.component),
                    });
                }
                let component = match component {
                    Some(root) => {
                        boxes[root].include(row.index, start, end);
                        root
                    }
                    None => {
                        boxes.push(BoundingBox::new(row.index, start, row.index, end));
                        sets.make_set()
                    }
                };
                current.push(Segment { start, end, component });
            }
            previous = current;
            previous_index = row.index;
        }

        let mut merged: Vec<Option<BoundingBox>> = vec![None; sets.len()];
        for (id, bbox) in boxes.iter().enumerate() {
            let root = sets.find(id);
            merged[root] = Some(match merged[root] {
                Some(existing) => existing.union(bbox),
                None => *bbox,
            });
        }

        let mut regions: Vec<BoundingBox> = merged
            .into_iter()
            .flatten()
            .filter(|bbox| bbox.height() >= self.min_rows && bbox.width() >= self.min_cols)
            .collect();
        regions.sort_by_key(|bbox| (bbox.min_row, bbox.min_col));
        debug!(
            "Sheet '{}': {} components, {} candidates",
            sheet_name,
            sets.len(),
            regions.len()
        );

        Ok(regions
            .into_iter()
            .enumerate()
            .map(|(id, bbox)| TableCandidate {
                id,
                sheet_name: sheet_name.to_owned(),
                bbox,
                confidence: CANDIDATE_CONFIDENCE,
                metadata: Map::new(),
            })
            .collect())
    }
}

/// Column intervals (1-based, inclusive) of the maximal runs of non-empty cells
fn row_segments(values: &[CellValue]) -> Vec<(usize, usize)> {
    let mut segments = Vec::new();
    let mut start = None;
    for (index, value) in values.iter().enumerate() {
        let col = index + 1;
        match (value.is_empty(), start) {
            (false, None) => start = Some(col),
            (true, Some(first)) => {
                segments.push((first, col - 1));
                start = None;
            }
            _ => (),
        }
    }
    if let Some(first) = start {
        segments.push((first, values.len()));
    }
    segments
}
