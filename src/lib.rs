/*!
# Exam Results Dashboard

A web dashboard that turns a spreadsheet of exam records into pass/fail and
grade charts, built in Rust.

## Overview

A user uploads an `.xlsx` (or `.csv`) file whose first sheet holds one row per
student per subject. Each row is classified as Pass or Fail and given a
letter grade, the records are aggregated per subject and per department, and
the dashboard shows four bar charts:

1. Subject-wise pass/fail counts
2. Department-wise pass/fail counts
3. Average internal, external and total marks per subject
4. Grade distribution per subject, one panel per subject

Every upload is processed on its own. Nothing is stored between requests.

## Input Format

The header row must contain these columns, spelled exactly:

| Column         | Content                  |
|----------------|--------------------------|
| `SUBJECT CODE` | Subject identifier       |
| `DEPARTMENT`   | Department identifier    |
| `INTERNAL`     | Internal assessment mark |
| `EXTERNAL`     | External examination mark|
| `TOTAL`        | Total mark               |

Other columns are ignored. Empty, negative or non-numeric scores are rejected
with a message naming the row and column.

## Classification

- **Pass** when `EXTERNAL >= 45` and `TOTAL >= 50`, otherwise **Fail**
- **Grade** from `TOTAL`: O from 91, A+ from 81, A from 71, B+ from 61,
  B from 51, C from 40, U below 40

## Modules

- **record**: Exam record, pass/fail and grade classification
- **error**: Load and export error types
- **loader**: Spreadsheet parsing and column validation (XLSX, CSV)
- **summary**: Aggregate tables per subject and department
- **chart**: Declarative chart specs and Vega-Lite output
- **downloader**: Export of the aggregate tables (CSV, XLSX)
- **config**: Server settings and command line arguments
- **graph**: SVG rendering of chart specs (`web` feature)
- **dashboard**: HTML page rendering (`web` feature)
- **app**: Routing and upload handlers (`web` feature)

## REST API Endpoints

All `POST` endpoints take a multipart form with the spreadsheet in the `file`
field.

- `GET /` - Upload page
- `POST /upload` - Dashboard page for the uploaded file
- `POST /api/summary` - Aggregate tables as JSON
- `POST /api/charts` - Vega-Lite specs of the four charts
- `POST /export/xlsx` - Aggregate tables as a workbook
- `POST /export/csv?table={name}` - One aggregate table as CSV
*/

pub mod chart;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod record;
pub mod summary;

pub mod app;
pub mod dashboard;
pub mod graph;

pub use chart::{ChartLayout, ChartSpec, dashboard_charts};
pub use config::ServerConfig;
pub use error::{ExportError, LoadError};
pub use loader::{load_path, load_upload};
pub use record::{Grade, Outcome, Record, classify, grade};
pub use summary::Summary;
