use crate::error::{LoadError, LoadResult};
use crate::record::Record;
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use log::debug;
use std::io::Cursor;
use std::path::Path;

pub const SUBJECT_CODE: &str = "SUBJECT CODE";
pub const DEPARTMENT: &str = "DEPARTMENT";
pub const INTERNAL: &str = "INTERNAL";
pub const EXTERNAL: &str = "EXTERNAL";
pub const TOTAL: &str = "TOTAL";

/// Column headers every uploaded sheet must carry (exact, case-sensitive)
pub const REQUIRED_COLUMNS: [&str; 5] = [SUBJECT_CODE, DEPARTMENT, INTERNAL, EXTERNAL, TOTAL];

/// A cell value normalised across the workbook and CSV readers
#[derive(Clone, Debug, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) => Cell::from_text(s),
            Data::Empty => Cell::Empty,
            other => Cell::from_text(&other.to_string()),
        }
    }
}

impl Cell {
    fn from_text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }
}

/// Positions of the required columns within the header row
struct ColumnIndex {
    subject_code: usize,
    department: usize,
    internal: usize,
    external: usize,
    total: usize,
}

impl ColumnIndex {
    /// Locates every required column, reporting all missing ones at once
    fn locate(header: &[String]) -> LoadResult<Self> {
        let find = |name: &str| header.iter().position(|h| h == name);
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();

        match (
            find(SUBJECT_CODE),
            find(DEPARTMENT),
            find(INTERNAL),
            find(EXTERNAL),
            find(TOTAL),
        ) {
            (Some(subject_code), Some(department), Some(internal), Some(external), Some(total)) => {
                Ok(Self {
                    subject_code,
                    department,
                    internal,
                    external,
                    total,
                })
            }
            _ => Err(LoadError::MissingColumns(missing)),
        }
    }
}

/// Load exam records from an uploaded file
///
/// The file type is picked from the extension of `file_name`. The first
/// worksheet (or the whole CSV) is read, with the first row as the header.
///
/// # Arguments
/// * `file_name` - Name of the uploaded file, used only to pick the format
/// * `bytes` - Raw file contents
///
/// # Returns
/// * `LoadResult<Vec<Record>>` - The validated records or the first problem found
///
/// # Examples
/// ```
/// use exam_dashboard::loader::load_upload;
///
/// let csv = "SUBJECT CODE,DEPARTMENT,INTERNAL,EXTERNAL,TOTAL\nCS101,CSE,30,60,90\n";
/// let records = load_upload("marks.csv", csv.as_bytes()).unwrap();
/// assert_eq!(records.len(), 1);
/// ```
pub fn load_upload(file_name: &str, bytes: &[u8]) -> LoadResult<Vec<Record>> {
    if bytes.is_empty() {
        return Err(LoadError::Empty);
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let records = match extension.as_deref() {
        Some("xlsx") => from_xlsx(bytes)?,
        Some("csv") => from_csv(bytes)?,
        Some(ext) => return Err(LoadError::UnsupportedFormat(ext.to_string())),
        None => return Err(LoadError::UnsupportedFormat(file_name.to_string())),
    };

    debug!("Loaded {} records from {}", records.len(), file_name);
    Ok(records)
}

/// Load exam records from a file on disk
pub fn load_path(path: impl AsRef<Path>) -> LoadResult<Vec<Record>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    load_upload(&file_name, &bytes)
}

/// Read records from the first worksheet of an XLSX workbook
pub fn from_xlsx(bytes: &[u8]) -> LoadResult<Vec<Record>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LoadError::NoWorksheet)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    // Sheet row number of the header, 1-based.
    let header_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(header_text).collect(),
        None => Vec::new(),
    };

    let body = rows.enumerate().map(|(i, row)| -> LoadResult<(usize, Vec<Cell>)> {
        let cells = row.iter().map(Cell::from).collect();
        Ok((header_row + i + 1, cells))
    });

    build_records(&header, body)
}

/// Read records from CSV text with a header row
pub fn from_csv(bytes: &[u8]) -> LoadResult<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let body = reader
        .records()
        .enumerate()
        .map(|(i, record)| -> LoadResult<(usize, Vec<Cell>)> {
            let record = record?;
            let cells = record.iter().map(Cell::from_text).collect();
            Ok((i + 2, cells))
        });

    build_records(&header, body)
}

fn header_text(data: &Data) -> String {
    match data {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn build_records<I>(header: &[String], rows: I) -> LoadResult<Vec<Record>>
where
    I: IntoIterator<Item = LoadResult<(usize, Vec<Cell>)>>,
{
    let columns = ColumnIndex::locate(header)?;
    let mut records = Vec::new();
    let empty = Cell::Empty;

    for row in rows {
        let (row_number, cells) = row?;
        let cell = |idx: usize| cells.get(idx).unwrap_or(&empty);

        let required = [
            cell(columns.subject_code),
            cell(columns.department),
            cell(columns.internal),
            cell(columns.external),
            cell(columns.total),
        ];
        if required.iter().all(|c| **c == Cell::Empty) {
            continue;
        }

        records.push(Record {
            subject_code: text_value(required[0], row_number, SUBJECT_CODE)?,
            department: text_value(required[1], row_number, DEPARTMENT)?,
            internal: score_value(required[2], row_number, INTERNAL)?,
            external: score_value(required[3], row_number, EXTERNAL)?,
            total: score_value(required[4], row_number, TOTAL)?,
        });
    }

    if records.is_empty() {
        return Err(LoadError::NoRecords);
    }
    Ok(records)
}

fn text_value(cell: &Cell, row: usize, column: &str) -> LoadResult<String> {
    match cell {
        Cell::Text(s) => Ok(s.clone()),
        // Codes typed as numbers come back as floats
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(format!("{}", *n as i64)),
        Cell::Number(n) => Ok(n.to_string()),
        Cell::Empty => Err(LoadError::MissingValue {
            row,
            column: column.to_string(),
        }),
    }
}

fn score_value(cell: &Cell, row: usize, column: &str) -> LoadResult<f64> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => n,
            _ => {
                return Err(LoadError::InvalidScore {
                    row,
                    column: column.to_string(),
                    value: s.clone(),
                });
            }
        },
        Cell::Empty => {
            return Err(LoadError::MissingValue {
                row,
                column: column.to_string(),
            });
        }
    };

    if value < 0.0 {
        return Err(LoadError::NegativeScore {
            row,
            column: column.to_string(),
            value,
        });
    }
    Ok(value)
}
