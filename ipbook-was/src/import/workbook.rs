//! Spreadsheet codec
//!
//! The import pipeline only sees row objects; [`WorkbookCodec`] is the seam to
//! the spreadsheet format. [`XlsxCodec`] reads workbooks with calamine and
//! writes single-sheet OOXML packages directly with zip + quick-xml.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use calamine::{DataType, Reader, Xlsx};
use ipbook_common::{Error, Result};
use quick_xml::escape::escape;
use serde_json::{Map, Value};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One spreadsheet row keyed by (mapped) column header
pub type SheetRow = Map<String, Value>;

/// Display header → record field. Headers not listed pass through unchanged.
pub const HEADER_MAP: &[(&str, &str)] = &[
    ("IP주소", "ipAddress"),
    ("자산유형", "assetType"),
    ("망속성", "netCategory"),
    ("망유형", "netType"),
    ("장비유형", "deviceType"),
    ("장비ID", "deviceId"),
    ("장비명", "deviceName"),
    ("운용국사", "officeNm"),
    ("운용본부", "bonbuNm"),
    ("운용센터", "centerNm"),
    ("운용부서", "deptNm"),
    ("부서코드", "deptCd"),
    ("운용부문", "bumunNm"),
    ("호스트명", "hostName"),
    ("호스트ID", "hostId"),
    ("설비바코드", "erpBarcode"),
    ("OS유형", "osType"),
    ("OS버전", "osVersion"),
    ("DB유형", "dbType"),
    ("DB버전", "dbVersion"),
    ("KT외타망연동여부", "externalNetYn"),
    ("개인정보보유여부", "privacyInfoYn"),
    ("TACS수용여부", "tacsYn"),
    ("계정관리시스템수용여부", "accntMgmtYn"),
    ("백신설치여부", "vaccineYn"),
    ("웹셀탐지Tool설치여부", "webshellYn"),
    ("UD Agent 설치 여부", "udagentYn"),
    ("SMP Agent 설치 여부", "smpagentYn"),
    ("대표IP 사용여부", "representYn"),
    ("IP유형1", "ipType1"),
    ("IP유형2", "ipType2"),
    ("IP유형3", "ipType3"),
    ("비고", "comment"),
];

/// Record field for a display header
pub fn field_for_header(header: &str) -> &str {
    HEADER_MAP
        .iter()
        .find(|(label, _)| *label == header)
        .map_or(header, |(_, field)| *field)
}

/// Converts between spreadsheet bytes and row objects
pub trait WorkbookCodec: Send + Sync {
    /// Rows of the first sheet. The first row is the header; missing cells
    /// read as empty strings and fully blank rows are skipped.
    fn decode_rows(&self, bytes: &[u8]) -> Result<Vec<SheetRow>>;

    /// A single-sheet workbook whose columns are the union of row keys in
    /// first-seen order
    fn encode_rows(&self, sheet_name: &str, rows: &[SheetRow]) -> Result<Vec<u8>>;
}

/// OOXML (.xlsx) codec
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxCodec;

impl WorkbookCodec for XlsxCodec {
    fn decode_rows(&self, bytes: &[u8]) -> Result<Vec<SheetRow>> {
        let mut workbook = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| Error::Workbook(format!("failed to read xlsx workbook: {e}")))?;

        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Ok(Vec::new());
        };
        let range = match workbook.worksheet_range(&sheet_name) {
            Some(Ok(range)) => range,
            Some(Err(e)) => {
                return Err(Error::Workbook(format!("failed to read sheet {sheet_name}: {e}")))
            }
            None => return Ok(Vec::new()),
        };

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| field_for_header(cell_text(cell).trim()).to_string())
            .collect();

        let decoded = rows
            .map(|cells| cells.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|texts| texts.iter().any(|t| !t.is_empty()))
            .map(|texts| {
                headers
                    .iter()
                    .enumerate()
                    .filter(|(_, header)| !header.is_empty())
                    .map(|(i, header)| {
                        let text = texts.get(i).cloned().unwrap_or_default();
                        (header.clone(), Value::String(text))
                    })
                    .collect::<SheetRow>()
            })
            .collect();

        Ok(decoded)
    }

    fn encode_rows(&self, sheet_name: &str, rows: &[SheetRow]) -> Result<Vec<u8>> {
        let mut columns: Vec<&str> = Vec::new();
        for key in rows.iter().flat_map(|row| row.keys()) {
            if !columns.contains(&key.as_str()) {
                columns.push(key.as_str());
            }
        }

        let mut strings = SharedStrings::default();
        let mut sheet = String::from(XML_DECL);
        sheet.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);

        let header: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        write_row(&mut sheet, &mut strings, 1, &header);
        for (i, row) in rows.iter().enumerate() {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| row.get(*c).map(value_text).unwrap_or_default())
                .collect();
            write_row(&mut sheet, &mut strings, i + 2, &cells);
        }
        sheet.push_str("</sheetData></worksheet>");

        let workbook = format!(
            r#"{XML_DECL}<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            escape(sheet_name)
        );

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/worksheets/sheet1.xml", sheet),
            ("xl/sharedStrings.xml", strings.into_xml()),
            ("xl/styles.xml", STYLES.to_string()),
        ];

        write_package(&parts).map_err(|e| Error::Workbook(format!("failed to write xlsx: {e}")))
    }
}

fn write_package(parts: &[(&str, String)]) -> std::result::Result<Vec<u8>, zip::result::ZipError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(*name, options)?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Text rendering of a cell. Integral numbers render without a fraction.
fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) | DataType::DateTimeIso(s) | DataType::DurationIso(s) => s.clone(),
        DataType::Float(v) | DataType::DateTime(v) | DataType::Duration(v) => number_text(*v),
        DataType::Int(v) => v.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Error(e) => format!("#{e:?}"),
        DataType::Empty => String::new(),
    }
}

fn number_text(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shared string table, deduplicated in insertion order
#[derive(Default)]
struct SharedStrings {
    index: HashMap<String, usize>,
    values: Vec<String>,
    refs: usize,
}

impl SharedStrings {
    fn intern(&mut self, text: &str) -> usize {
        self.refs += 1;
        if let Some(i) = self.index.get(text) {
            return *i;
        }
        let i = self.values.len();
        self.values.push(text.to_string());
        self.index.insert(text.to_string(), i);
        i
    }

    fn into_xml(self) -> String {
        let mut xml = format!(
            r#"{XML_DECL}<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.refs,
            self.values.len()
        );
        for value in &self.values {
            xml.push_str(r#"<si><t xml:space="preserve">"#);
            xml.push_str(&escape(&xml_safe(value)));
            xml.push_str("</t></si>");
        }
        xml.push_str("</sst>");
        xml
    }
}

/// Drop characters XML 1.0 cannot carry
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

fn write_row(sheet: &mut String, strings: &mut SharedStrings, row_number: usize, cells: &[String]) {
    sheet.push_str(&format!(r#"<row r="{row_number}">"#));
    for (col, text) in cells.iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        let index = strings.intern(text);
        sheet.push_str(&format!(
            r#"<c r="{}{row_number}" t="s"><v>{index}</v></c>"#,
            column_name(col)
        ));
    }
    sheet.push_str("</row>");
}

/// Spreadsheet column letters for a zero-based index (0 → A, 26 → AA)
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
    r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    r#"</Types>"#,
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
    r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#,
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"</styleSheet>"#,
);
