//! Office Open XML package helpers shared by the row reader and the merge resolver
use crate::error::TableError;
use crate::helpers::reader::PackageReader;
use crate::helpers::reader::PackageSource;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

/// XML tag name for relationship elements in `.rels` parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Workbook-level relationships part
pub(crate) const WORKBOOK_RELATIONSHIPS: &str = "xl/_rels/workbook.xml.rels";

/// Opens the package container as a ZIP archive.
///
/// OLE compound files (password protected packages, legacy `.xls`) are rejected up front.
pub(crate) fn open_archive(source: &PackageSource) -> Result<ZipArchive<PackageReader>, TableError> {
    let mut reader = source.open()?;
    if reader.is_compound_file()? {
        Err(SpreadsheetError::UnsupportedContainer(source.name()))?;
    }
    Ok(ZipArchive::new(reader)?)
}

/// Loads worksheet relationships from a `.rels` part
///
/// # Returns
/// Mapping of relationship IDs to archive paths, `None` when the part is absent
pub(crate) fn load_relationships(zip: &mut ZipArchive<PackageReader>, path: &str) -> Result<Option<HashMap<String, String>>, TableError> {
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(None),
    };
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Chart sheets and dialog sheets carry no cell grid
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(Some(relationships))
}

/// Maps `cellXfs` entries to cell types using custom and built-in formats
///
/// # Arguments
/// * `format_indexes` - `numFmtId` of each `xf`, in style index order
/// * `custom_formats` - Custom formats declared in `numFmts`
/// * `is_1904` - Whether the workbook uses the 1904 date system
pub(crate) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the archive
pub(crate) fn to_zip_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if let Some(absolute) = path.strip_prefix('/') {
        absolute.to_string()
    } else if path.starts_with("xl/") {
        path
    } else if let Some(relative) = path.strip_prefix("../") {
        relative.to_string()
    } else {
        format!("xl/{}", path.trim_start_matches("./"))
    }
}
