use crate::error::ExportError;
use crate::record::Outcome;
use crate::summary::{ResultTable, Summary};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::Deserialize;

/// The aggregate tables that can be exported on their own
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryTable {
    SubjectResults,
    DepartmentResults,
    SubjectAverages,
    GradeDistribution,
}

impl SummaryTable {
    pub const ALL: [SummaryTable; 4] = [
        SummaryTable::SubjectResults,
        SummaryTable::DepartmentResults,
        SummaryTable::SubjectAverages,
        SummaryTable::GradeDistribution,
    ];

    /// Name used in URLs and export file names
    pub fn slug(self) -> &'static str {
        match self {
            SummaryTable::SubjectResults => "subject-results",
            SummaryTable::DepartmentResults => "department-results",
            SummaryTable::SubjectAverages => "subject-averages",
            SummaryTable::GradeDistribution => "grade-distribution",
        }
    }

    /// Worksheet name in the XLSX export (at most 31 characters)
    fn sheet_name(self) -> &'static str {
        match self {
            SummaryTable::SubjectResults => "Subject Results",
            SummaryTable::DepartmentResults => "Department Results",
            SummaryTable::SubjectAverages => "Subject Averages",
            SummaryTable::GradeDistribution => "Grade Distribution",
        }
    }
}

/// One cell of an exported table, shared by both export formats
enum Value {
    Text(String),
    Number(f64),
}

fn table_rows(summary: &Summary, table: SummaryTable) -> (Vec<&'static str>, Vec<Vec<Value>>) {
    fn results(table: &ResultTable, key: &'static str) -> (Vec<&'static str>, Vec<Vec<Value>>) {
        let rows = table
            .rows
            .iter()
            .map(|row| {
                vec![
                    Value::Text(row.key.clone()),
                    Value::Number(row.count(Outcome::Pass) as f64),
                    Value::Number(row.count(Outcome::Fail) as f64),
                    Value::Number(row.total() as f64),
                    Value::Number(row.pass_rate() * 100.0),
                ]
            })
            .collect();
        (vec![key, "Pass", "Fail", "Total", "Pass %"], rows)
    }

    match table {
        SummaryTable::SubjectResults => results(&summary.subject_results, "SUBJECT CODE"),
        SummaryTable::DepartmentResults => results(&summary.department_results, "DEPARTMENT"),
        SummaryTable::SubjectAverages => (
            vec!["SUBJECT CODE", "INTERNAL", "EXTERNAL", "TOTAL"],
            summary
                .subject_averages
                .iter()
                .map(|row| {
                    vec![
                        Value::Text(row.subject_code.clone()),
                        Value::Number(row.internal),
                        Value::Number(row.external),
                        Value::Number(row.total),
                    ]
                })
                .collect(),
        ),
        SummaryTable::GradeDistribution => (
            vec!["SUBJECT CODE", "Grade", "Count"],
            summary
                .grade_distribution
                .iter()
                .map(|row| {
                    vec![
                        Value::Text(row.subject_code.clone()),
                        Value::Text(row.grade.label().to_string()),
                        Value::Number(row.count as f64),
                    ]
                })
                .collect(),
        ),
    }
}

/// Convert one summary table to CSV format
///
/// # Arguments
/// * `summary` - Aggregates computed from an upload
/// * `table` - Which table to write
///
/// # Returns
/// * `Result<String, ExportError>` - CSV content with a header row
pub fn to_csv(summary: &Summary, table: SummaryTable) -> Result<String, ExportError> {
    let (header, rows) = table_rows(summary, table);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(row.iter().map(|value| match value {
            Value::Text(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Convert all summary tables to XLSX format
///
/// Each table lands on its own worksheet with a bold header row.
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content as bytes
pub fn to_xlsx(summary: &Summary) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in SummaryTable::ALL {
        let worksheet = write_sheet(summary, table, &header_format)?;
        workbook.push_worksheet(worksheet);
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_sheet(
    summary: &Summary,
    table: SummaryTable,
    header_format: &Format,
) -> Result<Worksheet, XlsxError> {
    let (header, rows) = table_rows(summary, table);
    let mut worksheet = Worksheet::new();
    worksheet.set_name(table.sheet_name())?;

    for (c, name) in header.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *name, header_format)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            match value {
                Value::Text(s) => worksheet.write_string(r, c as u16, s.as_str())?,
                Value::Number(n) => worksheet.write_number(r, c as u16, *n)?,
            };
        }
    }

    Ok(worksheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use calamine::{Data, DataType, Reader, Xlsx, open_workbook_from_rs};
    use std::io::Cursor;

    fn summary() -> Summary {
        Summary::from_records(&[
            Record::new("CS101", "CSE", 30.0, 60.0, 90.0),
            Record::new("CS101", "ECE", 20.0, 44.0, 64.0),
            Record::new("MA201", "ECE", 15.0, 47.0, 62.0),
        ])
    }

    #[test]
    fn subject_results_csv() {
        let csv = to_csv(&summary(), SummaryTable::SubjectResults).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "SUBJECT CODE,Pass,Fail,Total,Pass %");
        assert_eq!(lines[1], "CS101,1,1,2,50");
        assert_eq!(lines[2], "MA201,1,0,1,100");
    }

    #[test]
    fn grade_distribution_csv_has_seven_rows_per_subject() {
        let csv = to_csv(&summary(), SummaryTable::GradeDistribution).unwrap();
        assert_eq!(csv.lines().count(), 1 + 14);
        assert!(csv.contains("CS101,A+,1"));
    }

    #[test]
    fn slugs_parse_back() {
        for table in SummaryTable::ALL {
            let parsed: SummaryTable =
                serde_json::from_value(serde_json::json!(table.slug())).unwrap();
            assert_eq!(parsed, table);
        }
    }

    #[test]
    fn xlsx_export_has_one_sheet_per_table() {
        let bytes = to_xlsx(&summary()).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec!["Subject Results", "Department Results", "Subject Averages", "Grade Distribution"]
        );

        let range = workbook.worksheet_range("Subject Averages").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("SUBJECT CODE".into())));
        assert_eq!(range.get_value((1, 1)).and_then(|v| v.as_f64()), Some(25.0));
    }
}
