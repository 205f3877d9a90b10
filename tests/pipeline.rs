use anyhow::Result;
use rusty_tables::extract_tables;
use rusty_tables::BoundingBox;
use rusty_tables::CellValue;
use rusty_tables::ExtractOptions;
use rusty_tables::PackageSource;
use rusty_tables::SheetReader;
use rusty_tables::TableExtractor;
use std::io::Cursor;
use std::io::Write;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn column_letters(mut number: usize) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        number -= 1;
        letters.insert(0, (b'A' + (number % 26) as u8) as char);
        number /= 26;
    }
    letters.into_iter().collect()
}

/// Worksheet XML from a grid: empty strings are absent cells, numbers are numeric cells
fn sheet_xml(grid: &[&[&str]], merges: &[&str]) -> String {
    let mut xml = String::from("<worksheet><sheetData>");
    for (row_index, row) in grid.iter().enumerate() {
        if row.iter().all(|value| value.is_empty()) {
            continue;
        }
        xml.push_str(&format!(r#"<row r="{}">"#, row_index + 1));
        for (col_index, value) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(col_index + 1), row_index + 1);
            if value.is_empty() {
                continue;
            } else if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value));
            } else {
                let escaped = value.replace('&', "&amp;").replace('<', "&lt;");
                xml.push_str(&format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, reference, escaped));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    if !merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, merges.len()));
        for merge in merges {
            xml.push_str(&format!(r#"<mergeCell ref="{}"/>"#, merge));
        }
        xml.push_str("</mergeCells>");
    }
    xml.push_str("</worksheet>");
    xml
}

/// Minimal `.xlsx` package holding the given worksheets in order
fn workbook(sheets: &[(&str, String)]) -> Result<Vec<u8>> {
    workbook_with_charts(sheets, &[])
}

/// Package with chart sheets declared ahead of the worksheets
fn workbook_with_charts(sheets: &[(&str, String)], charts: &[&str]) -> Result<Vec<u8>> {
    let mut declarations = String::new();
    let mut relationships = String::new();
    for (index, name) in charts.iter().enumerate() {
        declarations.push_str(&format!(r#"<sheet name="{}" sheetId="{}" r:id="rIdChart{}"/>"#, name, 100 + index, index + 1));
        relationships.push_str(&format!(
            r#"<Relationship Id="rIdChart{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet" Target="chartsheets/sheet{}.xml"/>"#,
            index + 1,
            index + 1
        ));
    }
    for (index, (name, _)) in sheets.iter().enumerate() {
        declarations.push_str(&format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, name, index + 1, index + 1));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            index + 1,
            index + 1
        ));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("xl/workbook.xml", options)?;
    write!(
        writer,
        r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
        declarations
    )?;
    writer.start_file("xl/_rels/workbook.xml.rels", options)?;
    write!(writer, "<Relationships>{}</Relationships>", relationships)?;
    for (index, (_, xml)) in sheets.iter().enumerate() {
        writer.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        writer.write_all(xml.as_bytes())?;
    }
    for index in 0..charts.len() {
        writer.start_file(format!("xl/chartsheets/sheet{}.xml", index + 1), options)?;
        writer.write_all(b"<chartsheet><drawing r:id=\"rId1\"/></chartsheet>")?;
    }
    Ok(writer.finish()?.into_inner())
}

fn report_sheet() -> String {
    sheet_xml(
        &[
            &["Quarterly sales", "", "", "", "", ""],
            &[],
            &["Name", "Age", "City", "", "Key", "Value"],
            &["Ann", "31", "Oslo", "", "a", "1"],
            &["Bo", "42", "Rome", "", "b", "2"],
            &["Cy", "27", "Lima"],
            &["Di", "35", "Kyiv"],
            &["Ed", "50", "Bern"],
        ],
        &["A1:C1"],
    )
}

fn stores_sheet() -> String {
    sheet_xml(
        &[
            &["Region", "Store", "Units"],
            &["North", "S1", "10"],
            &["", "S2", "11"],
            &["", "S3", "12"],
            &["South", "S4", "13"],
        ],
        &["A2:A4"],
    )
}

#[test]
fn extract_tables_from_file() -> Result<()> {
    init_logger();
    let mut file = NamedTempFile::new()?;
    file.write_all(&workbook(&[("Report", report_sheet())])?)?;

    let tables = extract_tables(file.path(), &ExtractOptions::default())?;
    assert_eq!(tables.len(), 2);

    let people = &tables[0];
    assert_eq!(people.table_id, "Report!A3:C8");
    assert_eq!(people.bbox, BoundingBox::new(3, 1, 8, 3));
    assert_eq!(people.columns, vec!["Name", "Age", "City"]);
    assert_eq!(people.rows.len(), 5);
    assert_eq!(people.header_row_relative_index(), Some(0));
    assert_eq!(people.rows[0]["Name"], CellValue::from("Ann"));
    assert_eq!(people.rows[4]["Age"], CellValue::Number(50.0));

    let pairs = &tables[1];
    assert_eq!(pairs.table_id, "Report!E3:F5");
    assert_eq!(pairs.columns, vec!["Key", "Value"]);
    assert_eq!(pairs.rows.len(), 2);
    Ok(())
}

#[test]
fn merged_cells_fill_their_range() -> Result<()> {
    init_logger();
    let bytes = workbook(&[("Stores", stores_sheet())])?;
    let tables = extract_tables(bytes, &ExtractOptions::default())?;

    assert_eq!(tables.len(), 1);
    let regions: Vec<String> = tables[0].rows.iter().map(|row| row["Region"].to_string()).collect();
    assert_eq!(regions, vec!["North", "North", "North", "South"]);
    Ok(())
}

#[test]
fn merged_cell_reader_invariant() -> Result<()> {
    let grid: &[&[&str]] = &[&["x", "y"], &["A", "1"], &["", "2"], &["", "3"]];
    let bytes = workbook(&[("Data", sheet_xml(grid, &["A2:A4"]))])?;
    let mut reader = SheetReader::open(bytes)?;
    let mut rows = reader.rows("Data")?;

    let mut anchors = Vec::new();
    while let Some(row) = rusty_tables::RowSource::next_row(&mut rows)? {
        anchors.push((row.index, row.values[0].clone()));
    }
    assert_eq!(anchors, vec![
        (1, CellValue::from("x")),
        (2, CellValue::from("A")),
        (3, CellValue::from("A")),
        (4, CellValue::from("A")),
    ]);
    Ok(())
}

#[test]
fn select_sheets_by_pattern() -> Result<()> {
    init_logger();
    let source = PackageSource::from(workbook(&[("Report", report_sheet()), ("Stores", stores_sheet())])?);

    let all = TableExtractor::new(ExtractOptions::default())?.extract(source.clone())?;
    assert_eq!(all.iter().map(|table| table.sheet_name.as_str()).collect::<Vec<_>>(), vec!["Report", "Report", "Stores"]);

    let options = ExtractOptions::default().with_sheets(["Sto*"]);
    let stores = TableExtractor::new(options)?.extract(source)?;
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].table_id, "Stores!A1:C5");
    Ok(())
}

#[test]
fn chart_sheets_are_skipped() -> Result<()> {
    init_logger();
    let bytes = workbook_with_charts(&[("Stores", stores_sheet())], &["Chart1"])?;

    let tables = extract_tables(bytes.clone(), &ExtractOptions::default())?;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table_id, "Stores!A1:C5");

    let mut reader = SheetReader::open(bytes)?;
    assert_eq!(reader.sheet_names(), vec!["Chart1", "Stores"]);
    assert_eq!(reader.worksheet_names(), vec!["Stores"]);
    let error = reader.rows("Chart1").err().map(|error| error.to_string()).unwrap_or_default();
    assert!(error.ends_with("Sheet 'Chart1' not found"), "{}", error);
    Ok(())
}

#[test]
fn oversized_merge_references_are_ignored() -> Result<()> {
    init_logger();
    let grid: &[&[&str]] = &[&["Region", "Units"], &["North", "10"], &["", "11"]];
    let merges = ["A2:A3", "A1:ZZZZZZZZZZZZZ1", "A1:B99999999", "XFE1:XFE2"];
    let bytes = workbook(&[("Data", sheet_xml(grid, &merges))])?;

    let tables = extract_tables(bytes, &ExtractOptions::default())?;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].columns, vec!["Region", "Units"]);
    let regions: Vec<String> = tables[0].rows.iter().map(|row| row["Region"].to_string()).collect();
    assert_eq!(regions, vec!["North", "North"]);
    Ok(())
}

#[test]
fn stacked_tables_need_a_gap_row() -> Result<()> {
    let separated: &[&[&str]] = &[&["a", "b"], &["1", "2"], &[], &["c", "d"], &["3", "4"]];
    let touching: &[&[&str]] = &[&["a", "b"], &["1", "2"], &["c", "d"], &["3", "4"]];
    let bytes = workbook(&[("Gap", sheet_xml(separated, &[])), ("NoGap", sheet_xml(touching, &[]))])?;

    let tables = extract_tables(bytes, &ExtractOptions::default())?;
    let counts: Vec<(String, usize)> = ["Gap", "NoGap"]
        .iter()
        .map(|sheet| (sheet.to_string(), tables.iter().filter(|table| table.sheet_name == *sheet).count()))
        .collect();
    assert_eq!(counts, vec![("Gap".to_owned(), 2), ("NoGap".to_owned(), 1)]);
    Ok(())
}

#[test]
fn detection_is_repeatable() -> Result<()> {
    let source = PackageSource::from(workbook(&[("Report", report_sheet())])?);
    let extractor = TableExtractor::new(ExtractOptions::default())?;
    let merges = std::sync::Arc::new(rusty_tables::MergeResolver::new(source));
    let first = extractor.detect_sheet(&merges, "Report")?;
    let second = extractor.detect_sheet(&merges, "Report")?;
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    Ok(())
}

#[test]
fn tables_serialize_to_json() -> Result<()> {
    let bytes = workbook(&[("Stores", stores_sheet())])?;
    let tables = extract_tables(bytes, &ExtractOptions::default())?;
    let json = serde_json::to_value(&tables)?;
    assert_eq!(json[0]["metadata"]["header_row_relative_index"], 0);
    assert_eq!(json[0]["rows"][1]["Region"], "North");
    assert_eq!(json[0]["rows"][1]["Units"], 11.0);
    Ok(())
}

#[test]
fn invalid_inputs() -> Result<()> {
    let mut compound = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    compound.resize(512, 0);
    let error = extract_tables(compound, &ExtractOptions::default()).unwrap_err();
    assert!(error.to_string().contains("Unsupported container"), "{}", error);

    assert!(extract_tables(b"plain text".to_vec(), &ExtractOptions::default()).is_err());
    assert!(extract_tables("/definitely/missing.xlsx", &ExtractOptions::default()).is_err());

    let options = ExtractOptions::default().with_min_cols(0);
    assert!(TableExtractor::new(options).is_err());

    let bytes = workbook(&[("Data", stores_sheet())])?;
    let mut reader = SheetReader::open(bytes)?;
    let error = reader.rows("Missing").err().map(|error| error.to_string()).unwrap_or_default();
    assert!(error.ends_with("Sheet 'Missing' not found"), "{}", error);
    Ok(())
}
