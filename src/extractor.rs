use crate::detection::builder::TableBuilder;
use crate::detection::detector::RegionDetector;
use crate::detection::model::ExtractedTable;
use crate::detection::model::TableCandidate;
use crate::detection::options::ExtractOptions;
use crate::error::ResultMessage;
use crate::error::TableError;
use crate::helpers::reader::PackageSource;
use crate::spreadsheet::merges::MergeResolver;
use crate::spreadsheet::reader::SheetReader;
use log::info;
use std::sync::Arc;

/// Runs detection and extraction over the sheets of a package.
///
/// Each sheet is read twice, each time through a fresh [`SheetReader`];
/// the merge ranges are resolved once per package and shared by both passes.
#[derive(Clone, Debug, Default)]
pub struct TableExtractor {
    options: ExtractOptions,
}

impl TableExtractor {
    pub fn new(options: ExtractOptions) -> Result<Self, TableError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extracts the tables of every selected sheet, in workbook order.
    pub fn extract(&self, source: impl Into<PackageSource>) -> Result<Vec<ExtractedTable>, TableError> {
        let merges = Arc::new(MergeResolver::new(source.into()));
        let selector = self.options.sheet_selector()?;
        let sheet_names = SheetReader::with_merges(Arc::clone(&merges))?.worksheet_names();

        let mut tables = Vec::new();
        for sheet_name in sheet_names.iter().filter(|name| selector.accept(name)) {
            tables.extend(self.extract_sheet(&merges, sheet_name)?);
        }
        info!(
            "Extracted {} tables from {} sheets of {}",
            tables.len(),
            sheet_names.len(),
            merges.source().name()
        );
        Ok(tables)
    }

    /// Detection pass then extraction pass over one sheet.
    pub fn extract_sheet(&self, merges: &Arc<MergeResolver>, sheet_name: &str) -> Result<Vec<ExtractedTable>, TableError> {
        let candidates = self.detect_sheet(merges, sheet_name)?;
        if candidates.is_empty() {
            info!("Sheet '{}': no table candidates", sheet_name);
            return Ok(Vec::new());
        }

        let mut reader = SheetReader::with_merges(Arc::clone(merges))?;
        let count = candidates.len();
        let tables = TableBuilder::from_options(&self.options)
            .build(reader.rows(sheet_name)?, candidates)
            .with_prefix(sheet_name)?;
        info!("Sheet '{}': {} candidates, {} tables", sheet_name, count, tables.len());
        Ok(tables)
    }

    /// Detection pass only.
    pub fn detect_sheet(&self, merges: &Arc<MergeResolver>, sheet_name: &str) -> Result<Vec<TableCandidate>, TableError> {
        let mut reader = SheetReader::with_merges(Arc::clone(merges))?;
        let rows = reader.rows(sheet_name)?;
        let candidates = RegionDetector::from_options(&self.options)
            .detect(rows, sheet_name)
            .with_prefix(sheet_name)?;
        Ok(candidates)
    }
}

/// Extracts every table of a package with the given options.
pub fn extract_tables(source: impl Into<PackageSource>, options: &ExtractOptions) -> Result<Vec<ExtractedTable>, TableError> {
    TableExtractor::new(options.clone())?.extract(source)
}
