use crate::{cell::Cell, PerfError};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Formats the per-agent sheet can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractFormat {
    Xlsx,
    Csv,
    Json,
}

impl ExtractFormat {
    pub fn from_path(path: &Path) -> Result<Self, PerfError> {
        match path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()) {
            Some(ext) if ext == "xlsx" => Ok(ExtractFormat::Xlsx),
            Some(ext) if ext == "csv" => Ok(ExtractFormat::Csv),
            Some(ext) if ext == "json" => Ok(ExtractFormat::Json),
            _ => Err(PerfError::Config(format!(
                "Unsupported extract format for {} (expected .xlsx, .csv or .json)",
                path.display()
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractFormat::Xlsx => "xlsx",
            ExtractFormat::Csv => "csv",
            ExtractFormat::Json => "json",
        }
    }
}

/// The untouched cell grid of one sheet, banner rows included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtract {
    pub rows: Vec<Vec<Cell>>,
}

impl RawExtract {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string fields, parsing each the way a reader would.
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|field| Cell::parse(field)).collect())
                .collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonExtract {
    Rows(Vec<Vec<Cell>>),
    Sheets(BTreeMap<String, Vec<Vec<Cell>>>),
}

/// Parse extract bytes. `sheet` names the worksheet of a workbook, or of a
/// JSON export holding several; CSV has a single sheet.
pub fn read_bytes(bytes: &[u8], format: ExtractFormat, sheet: &str) -> Result<RawExtract, PerfError> {
    let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match format {
        ExtractFormat::Xlsx => read_xlsx(bytes, sheet),
        ExtractFormat::Csv => read_csv(text),
        ExtractFormat::Json => read_json(text, sheet),
    }
}

pub fn read_path(path: &Path, sheet: &str) -> Result<RawExtract, PerfError> {
    let format = ExtractFormat::from_path(path)?;
    let bytes = fs::read(path)?;
    read_bytes(&bytes, format, sheet)
}

fn read_xlsx(bytes: &[u8], sheet: &str) -> Result<RawExtract, PerfError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range(sheet).map_err(|err| match err {
        XlsxError::WorksheetNotFound(_) => PerfError::Config(format!("Sheet '{}' not found in workbook", sheet)),
        other => PerfError::from(other),
    })?;

    // the range starts at the first used cell; keep sheet coordinates so the
    // header offset counts rows from the top of the sheet
    let (top, left) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); top as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Null; left as usize];
        cells.extend(row.iter().map(workbook_cell));
        rows.push(cells);
    }
    Ok(RawExtract { rows })
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::Int(v) => Cell::Int(*v),
        Data::Float(v) if v.is_finite() => Cell::Float(*v),
        Data::Float(_) => Cell::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Cell::Null
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawExtract, PerfError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::parse).collect());
    }
    Ok(RawExtract { rows })
}

fn read_json(bytes: &[u8], sheet: &str) -> Result<RawExtract, PerfError> {
    match serde_json::from_slice::<JsonExtract>(bytes)? {
        JsonExtract::Rows(rows) => Ok(RawExtract { rows }),
        JsonExtract::Sheets(mut sheets) => sheets
            .remove(sheet)
            .map(RawExtract::new)
            .ok_or_else(|| PerfError::Config(format!("Sheet '{}' not found in JSON extract", sheet))),
    }
}
