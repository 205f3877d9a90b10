use crate::error::ResultMessage;
use crate::error::TableError;
use crate::helpers::reader::PackageReader;
use crate::helpers::reader::PackageSource;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::excel;
use crate::spreadsheet::range::MergeRange;
use crate::spreadsheet::xlsx::load_workbook;
use log::debug;
use log::warn;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::sync::OnceLock;
use zip::ZipArchive;

const TAG_MERGE_CELLS: QName = QName(b"mergeCells"); // Merge declarations container
const TAG_MERGE_CELL: QName = QName(b"mergeCell");   // Individual merge declaration

/// Per-file lookup of merged-cell ranges, keyed by sheet name.
///
/// The ranges are read on first access and then kept for the lifetime of the resolver.
/// Share it between the readers of one file with `Arc`; never between files.
pub struct MergeResolver {
    source: PackageSource,
    merges: OnceLock<HashMap<String, Vec<MergeRange>>>,
}

impl MergeResolver {
    pub fn new(source: PackageSource) -> Self {
        Self {
            source,
            merges: OnceLock::new(),
        }
    }

    /// Package this resolver reads from.
    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    /// All merge ranges of the workbook, computed on first call.
    ///
    /// Failures are returned without caching anything, so a later call tries again.
    pub fn merges(&self) -> Result<&HashMap<String, Vec<MergeRange>>, TableError> {
        if let Some(merges) = self.merges.get() {
            return Ok(merges);
        }
        let merges = self.load().with_prefix(&self.source.name())?;
        Ok(self.merges.get_or_init(|| merges))
    }

    /// Merge ranges of one sheet, sorted by top row; empty when the sheet has none.
    pub fn sheet_merges(&self, sheet_name: &str) -> Result<&[MergeRange], TableError> {
        Ok(self
            .merges()?
            .get(sheet_name)
            .map(|ranges| ranges.as_slice())
            .unwrap_or_default())
    }

    fn load(&self) -> Result<HashMap<String, Vec<MergeRange>>, TableError> {
        let mut zip = excel::open_archive(&self.source)?;
        let (sheets, _) = load_workbook(&mut zip)?;
        let mut merges = HashMap::with_capacity(sheets.len());
        for (name, path) in sheets {
            let ranges = match path {
                Some(path) => match read_merge_cells(&mut zip, &path) {
                    Ok(ranges) => ranges,
                    Err(error) => {
                        warn!("Sheet '{}' merges unreadable, assuming none: {}", name, error);
                        Vec::new()
                    }
                },
                None => {
                    debug!("Sheet '{}' has no resolvable part, assuming no merges", name);
                    Vec::new()
                }
            };
            merges.insert(name, ranges);
        }
        Ok(merges)
    }
}

/// Streams one worksheet part and collects its `<mergeCell ref=".."/>` declarations.
///
/// Malformed or undecodable references are skipped; a missing part yields no merges.
fn read_merge_cells(zip: &mut ZipArchive<PackageReader>, path: &str) -> Result<Vec<MergeRange>, TableError> {
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => {
            debug!("Worksheet part '{}' is missing, assuming no merges", path);
            return Ok(Vec::new());
        }
    };
    let mut ranges = Vec::new();
    let mut merge_cells_context = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_MERGE_CELLS => merge_cells_context = true,
        Event::End(event) if event.name() == TAG_MERGE_CELLS => break,
        Event::Start(event) if merge_cells_context && event.name() == TAG_MERGE_CELL => {
            match event.get_attribute_value("ref") {
                Ok(Some(reference)) => match MergeRange::parse(&reference) {
                    Ok(range) => ranges.push(range),
                    Err(error) => warn!("Skip merge declaration in '{}': {}", path, error),
                },
                Ok(None) => warn!("Skip merge declaration without reference in '{}'", path),
                Err(error) => warn!("Skip undecodable merge declaration in '{}': {}", path, error),
            }
        }
    });
    ranges.sort_by_key(|range: &MergeRange| (range.min_row, range.min_col));
    Ok(ranges)
}
