//! Spreadsheet readers: turn CSV and XLSX bytes into a [`RawTable`].
//!
//! Readers only recover structure (header row + string cells). Column
//! resolution and numeric coercion happen in the core crate, so a reader
//! fails only when the file itself cannot be parsed.

use std::io::Read;
use std::path::Path;

use keyword_pulse_core::table::RawTable;

/// Maximum cells to read from a worksheet; larger sheets are rejected.
const XLSX_MAX_CELLS_PER_SHEET: usize = 2_000_000;
/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 200 * 1024 * 1024;
/// Columns beyond this are ignored; keyword exports have a handful.
const XLSX_MAX_COLUMNS: usize = 256;

/// Spreadsheet formats recognized by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(SheetFormat::Csv),
            "xlsx" | "xlsm" => Ok(SheetFormat::Xlsx),
            "xls" => Err(ExtractError::Unsupported(
                "legacy .xls workbooks are not supported; re-save as .xlsx or .csv".to_string(),
            )),
            other => Err(ExtractError::Unsupported(format!(
                "unrecognized file extension '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("XLSX parse failed: {0}")]
    Xlsx(String),
    #[error("no header row found")]
    Empty,
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractError::Xlsx(e.to_string())
    }
}

impl From<quick_xml::Error> for ExtractError {
    fn from(e: quick_xml::Error) -> Self {
        ExtractError::Xlsx(e.to_string())
    }
}

pub fn read_table(bytes: &[u8], format: SheetFormat) -> Result<RawTable, ExtractError> {
    match format {
        SheetFormat::Csv => read_csv(bytes),
        SheetFormat::Xlsx => read_xlsx(bytes),
    }
}

/// Read a delimited text table. Tab-separated input is detected from the
/// header line; everything else is comma-separated.
pub fn read_csv(bytes: &[u8]) -> Result<RawTable, ExtractError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = if first_line.contains(&b'\t') && !first_line.contains(&b',') {
        b'\t'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ExtractError::Empty);
    }

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect(),
        );
    }
    Ok(RawTable::new(headers, rows))
}

/// Read the first worksheet of an XLSX workbook. The first row with any
/// non-empty cell is the header.
pub fn read_xlsx(bytes: &[u8]) -> Result<RawTable, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_name = first_worksheet_name(&archive)
        .ok_or_else(|| ExtractError::Xlsx("workbook has no worksheets".to_string()))?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet_name, MAX_XML_ENTRY_BYTES)?;

    let mut grid = read_sheet_rows(&sheet_xml, &shared_strings, XLSX_MAX_CELLS_PER_SHEET)?.into_iter();
    let headers = grid
        .by_ref()
        .find(|row| row.iter().any(|c| !c.trim().is_empty()))
        .ok_or(ExtractError::Empty)?;
    Ok(RawTable::new(headers, grid.collect()))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Xlsx(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Xlsx(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Shared string table; a workbook with only numbers or inline strings
/// may legitimately omit it.
fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, ExtractError> {
    const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
    if !archive.file_names().any(|n| n == SHARED_STRINGS) {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, SHARED_STRINGS, MAX_XML_ENTRY_BYTES)?;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            quick_xml::events::Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = current.is_some(),
                _ => {}
            },
            quick_xml::events::Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            quick_xml::events::Event::Text(te) if in_t => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&te.unescape()?);
                }
            }
            quick_xml::events::Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn first_worksheet_name(archive: &zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Option<String> {
    archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches("xl/worksheets/sheet")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(str::to_string)
}

/// Cell type attribute (`t="..."`) values that matter for decoding.
#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    Shared,
    Inline,
    Plain,
}

fn read_sheet_rows(
    xml: &[u8],
    shared_strings: &[String],
    max_cells: usize,
) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row: Vec<String> = Vec::new();
    let mut column = 0usize;
    let mut kind = CellKind::Plain;
    let mut value = String::new();
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            quick_xml::events::Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Vec::new();
                }
                b"c" => {
                    column = row.len();
                    kind = CellKind::Plain;
                    value.clear();
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                if let Some(idx) = column_index(&attr.value) {
                                    column = idx;
                                }
                            }
                            b"t" => {
                                kind = match attr.value.as_ref() {
                                    b"s" => CellKind::Shared,
                                    b"inlineStr" => CellKind::Inline,
                                    _ => CellKind::Plain,
                                };
                            }
                            _ => {}
                        }
                    }
                }
                b"v" => in_value = true,
                b"t" if kind == CellKind::Inline => in_value = true,
                _ => {}
            },
            quick_xml::events::Event::Text(te) if in_value => {
                value.push_str(&te.unescape()?);
            }
            quick_xml::events::Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let text = match kind {
                        CellKind::Shared => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared_strings.get(i).cloned())
                            .unwrap_or_default(),
                        CellKind::Inline | CellKind::Plain => std::mem::take(&mut value),
                    };
                    if column < XLSX_MAX_COLUMNS {
                        if row.len() <= column {
                            row.resize(column + 1, String::new());
                        }
                        row[column] = text;
                    }
                    value.clear();
                    cell_count += 1;
                    if cell_count > max_cells {
                        return Err(ExtractError::Xlsx(format!(
                            "worksheet exceeds cell limit ({} cells)",
                            max_cells
                        )));
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

/// Zero-based column index from a cell reference such as `"B7"` or `"AA12"`.
/// References with more than three letters (past `XFD`) are rejected.
fn column_index(reference: &[u8]) -> Option<usize> {
    let letters: Vec<u8> = reference
        .iter()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let n = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
    Some(n - 1)
}
