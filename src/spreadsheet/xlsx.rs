use crate::error::TableError;
use crate::helpers::reader::PackageReader;
use crate::helpers::reader::PackageSource;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::WORKBOOK_RELATIONSHIPS;
use crate::spreadsheet::reference::reference_to_position;
use crate::spreadsheet::reference::MAX_ROWS;
use crate::spreadsheet::source::Row;
use crate::spreadsheet::source::RowSource;
use crate::spreadsheet::SpreadsheetError;
use log::debug;
use log::warn;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::BufReader;
use std::mem;
use zip::read::ZipFile;
use zip::ZipArchive;

// XML tag names for parsing SpreadsheetML parts
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// Path of the workbook part inside the package
pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Declared worksheets in workbook order: name and archive path (when resolvable)
pub(crate) type SheetParts = Vec<(String, Option<String>)>;

/// An opened XLSX package ready to stream worksheet rows
pub(crate) struct XlsxWorkbook {
    /// ZIP archive containing the package parts
    zip: ZipArchive<PackageReader>,
    /// Parsed number formats indexed by style ID
    number_formats: Vec<CellType>,
    /// Shared string table
    shared_strings: Vec<String>,
    /// Declared worksheets
    sheets: SheetParts,
}

impl XlsxWorkbook {
    /// Opens a package and loads workbook structure, styles and shared strings
    pub(crate) fn open(source: &PackageSource) -> Result<XlsxWorkbook, TableError> {
        let mut zip = excel::open_archive(source)?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(source.name()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        Ok(XlsxWorkbook {
            zip,
            number_formats,
            shared_strings,
            sheets,
        })
    }

    /// Declared sheet names in workbook order
    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Names of the sheets backed by a worksheet part, in workbook order.
    /// Chart sheets and dangling relationships are left out.
    pub(crate) fn worksheet_names(&self) -> Vec<String> {
        self.sheets
            .iter()
            .filter_map(|(name, path)| match path {
                Some(_) => Some(name.to_owned()),
                None => {
                    debug!("Sheet '{}' has no worksheet part, skipped", name);
                    None
                }
            })
            .collect()
    }

    /// Starts a forward-only row cursor over one worksheet
    pub(crate) fn rows(&mut self, sheet_name: &str) -> Result<XlsxRows<'_>, TableError> {
        let path = match self.sheets.iter().find(|(name, _)| name == sheet_name) {
            Some((_, Some(path))) => path.to_owned(),
            _ => Err(SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?,
        };
        let XlsxWorkbook { zip, number_formats, shared_strings, .. } = self;
        let reader = zip
            .xml_reader(&path)?
            .ok_or_else(|| SpreadsheetError::MissingPart(path.to_owned()))?;
        Ok(XlsxRows {
            reader,
            shared_strings,
            number_formats,
            next_index: 1,
            last_physical: 0,
            pending: None,
            exhausted: false,
        })
    }
}

/// Streams the `<sheetData>` of one worksheet part row by row.
///
/// Rows absent from the XML are emitted as empty rows so indices stay contiguous.
pub struct XlsxRows<'a> {
    reader: XmlReader<BufReader<ZipFile<'a, PackageReader>>>,
    shared_strings: &'a [String],
    number_formats: &'a [CellType],
    /// Index of the next row to hand out
    next_index: usize,
    /// Index of the last `<row>` element read
    last_physical: usize,
    /// Physical row read ahead while gap rows are handed out
    pending: Option<Row>,
    exhausted: bool,
}

impl XlsxRows<'_> {
    /// Reads the next `<row>` element, `None` at end of the part
    fn read_physical_row(&mut self) -> Result<Option<Row>, TableError> {
        let mut row: Option<Row> = None;
        let mut col_count = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        match_xml_events!(self.reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                let index = event.parse_attribute_value::<usize>("r")?
                    .filter(|index| (1..=MAX_ROWS).contains(index))
                    .unwrap_or(self.last_physical + 1);
                row = Some(Row::new(index, Vec::new()));
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                if let Some(row) = row.take() {
                    self.last_physical = row.index;
                    return Ok(Some(row));
                }
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                col = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_position(&reference))
                    .map(|(_, col)| col)
                    .unwrap_or(col_count + 1);
                col_count = col;
                kind = match event.get_attribute_value("t")?.as_deref() {
                    Some("inlineStr") | Some("str") => CellType::InlineString,
                    Some("s") => CellType::SharedString,
                    Some("d") => CellType::IsoDateTime,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    _ => CellType::Number,
                };
                if kind == CellType::Number {
                    if let Some(style) = event.get_attribute_value("s")?.and_then(|style| style.parse::<usize>().ok()) {
                        kind = self.number_formats.get(style).copied().unwrap_or(CellType::Number);
                    }
                }
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut self.reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut self.reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(row) = row.as_mut() {
                    if !value.is_empty() && col > 0 {
                        let cell = resolve_value(self.shared_strings, kind, mem::take(&mut value));
                        if row.values.len() < col {
                            row.values.resize(col, CellValue::Empty);
                        }
                        row.values[col - 1] = cell;
                    }
                }
                kind = CellType::default();
                value.clear();
            }
        });
        Ok(None)
    }
}

impl RowSource for XlsxRows<'_> {
    fn next_row(&mut self) -> Result<Option<Row>, TableError> {
        if self.pending.is_none() && !self.exhausted {
            self.pending = self.read_physical_row()?;
            self.exhausted = self.pending.is_none();
        }
        match self.pending.take() {
            None => Ok(None),
            Some(row) if row.index > self.next_index => {
                let gap = Row::new(self.next_index, Vec::new());
                self.next_index += 1;
                self.pending = Some(row);
                Ok(Some(gap))
            }
            Some(mut row) => {
                if row.index < self.next_index {
                    warn!("Row {} is out of order, renumbered to {}", row.index, self.next_index);
                    row.index = self.next_index;
                }
                self.next_index = row.index + 1;
                Ok(Some(row))
            }
        }
    }
}

/// Turns the raw content of a `<c>` element into a value
fn resolve_value(shared_strings: &[String], kind: CellType, raw: String) -> CellValue {
    match kind {
        CellType::SharedString => match raw.trim().parse::<usize>().ok().and_then(|index| shared_strings.get(index)) {
            Some(text) => CellValue::Text(text.to_owned()),
            None => {
                warn!("Shared string index '{}' is out of range", raw);
                CellValue::Empty
            }
        },
        _ => kind.to_value(raw),
    }
}

/// Loads the worksheet list and date system from the workbook part
///
/// Sheets whose relationship cannot be resolved are kept with no path.
pub(crate) fn load_workbook(zip: &mut ZipArchive<PackageReader>) -> Result<(SheetParts, bool), TableError> {
    let relationships = load_relationships(zip, WORKBOOK_RELATIONSHIPS)?.unwrap_or_else(|| {
        warn!("Missing {}, worksheets cannot be resolved", WORKBOOK_RELATIONSHIPS);
        HashMap::new()
    });
    let mut reader = zip.xml_reader(WORKBOOK_PART)?
        .ok_or_else(|| SpreadsheetError::MissingPart(WORKBOOK_PART.to_string()))?;
    let mut sheets: SheetParts = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some(name) = name {
                let path = id.and_then(|id| relationships.get(id.as_ref()).cloned());
                sheets.push((name.to_string(), path));
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell styles from the styles part
///
/// # Returns
/// Vector of CellType values indexed by style ID
fn load_number_formats(zip: &mut ZipArchive<PackageReader>, is_1904: bool) -> Result<Vec<CellType>, TableError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut has_custom_formats = false;
    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut has_format_indexes = false;
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if !custom_formats_context && event.name() == TAG_CUSTOM_FORMATS => {
            has_custom_formats = true;
            custom_formats_context = true;
        }
        Event::End(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMATS => {
            custom_formats_context = false;
            if has_custom_formats && has_format_indexes {
                break;
            }
        }
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), style);
            }
        }

        Event::Start(event) if !format_indexes_context && event.name() == TAG_FORMAT_INDEXES => {
            has_format_indexes = true;
            format_indexes_context = true;
        }
        Event::End(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEXES => {
            format_indexes_context = false;
            if has_custom_formats && has_format_indexes {
                break;
            }
        }
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            if let Some(id) = event.get_attribute_value("numFmtId")? {
                format_indexes.push(id.to_string());
            }
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Loads the whole shared string table, empty when the part is absent
fn load_shared_strings(zip: &mut ZipArchive<PackageReader>) -> Result<Vec<String>, TableError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads string content up to `end_tag`, skipping phonetic annotations
///
/// # Arguments
/// * `reader` - XML reader positioned just after the opening tag
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether text directly under the element counts (`<v>`) or only `<t>` runs
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, TableError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
