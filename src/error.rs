use thiserror::Error;

/// Errors raised while turning an uploaded file into records
///
/// All of these are user-facing: the dashboard shows the message next to
/// the upload form and waits for another file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No file was uploaded or the file is empty")]
    Empty,

    #[error("Unsupported file type '{0}'. Upload an .xlsx or .csv file")]
    UnsupportedFormat(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("The workbook has no worksheets")]
    NoWorksheet,

    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Row {row}: '{column}' is empty")]
    MissingValue { row: usize, column: String },

    #[error("Row {row}: '{column}' value '{value}' is not a number")]
    InvalidScore {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: '{column}' value {value} is negative")]
    NegativeScore {
        row: usize,
        column: String,
        value: f64,
    },

    #[error("The sheet has a header row but no records")]
    NoRecords,
}

/// Errors raised while exporting summary tables
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("XLSX Error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LoadResult<T> = Result<T, LoadError>;
