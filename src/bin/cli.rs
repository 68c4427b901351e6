#![cfg(not(tarpaulin_include))]

use clap::Parser;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use env_logger::Env;
use exam_dashboard::chart::{ChartLayout, dashboard_charts};
use exam_dashboard::downloader;
use exam_dashboard::loader;
use exam_dashboard::record::Grade;
use exam_dashboard::summary::{ResultTable, Summary};
use log::info;
use std::path::PathBuf;

/// Prints the exam result tables of a spreadsheet and exports them
#[derive(Parser, Debug)]
#[command(name = "exam-report")]
struct Args {
    /// Spreadsheet of exam records (.xlsx or .csv)
    file: PathBuf,

    /// Write the aggregate tables to this workbook
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Print the Vega-Lite specs of the dashboard charts
    #[arg(long)]
    vega_lite: bool,

    /// Write one SVG per dashboard chart into this directory
    #[arg(long)]
    svg_dir: Option<PathBuf>,
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn number(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_results(title: &str, key: &str, results: &ResultTable) {
    println!("\n{}", title);
    let mut table = new_table();
    table.set_header(header(&[key, "Pass", "Fail", "Total", "Pass %"]));
    for row in &results.rows {
        table.add_row(vec![
            Cell::new(&row.key),
            number(row.pass),
            number(row.fail),
            number(row.total()),
            number(format!("{:.1}", row.pass_rate() * 100.0)),
        ]);
    }
    println!("{table}");
}

fn print_summary(summary: &Summary) {
    print_results("Subject-wise Pass/Fail Count", "SUBJECT CODE", &summary.subject_results);
    print_results("Department-wise Pass/Fail Count", "DEPARTMENT", &summary.department_results);

    println!("\nAverage Marks per Subject");
    let mut table = new_table();
    table.set_header(header(&["SUBJECT CODE", "INTERNAL", "EXTERNAL", "TOTAL"]));
    for row in &summary.subject_averages {
        table.add_row(vec![
            Cell::new(&row.subject_code),
            number(format!("{:.2}", row.internal)),
            number(format!("{:.2}", row.external)),
            number(format!("{:.2}", row.total)),
        ]);
    }
    println!("{table}");

    // One row per subject, one column per grade
    println!("\nSubject-wise Grade Distribution");
    let mut names = vec!["SUBJECT CODE"];
    names.extend(Grade::ALL.iter().map(|g| g.label()));
    let mut table = new_table();
    table.set_header(header(&names));
    for chunk in summary.grade_distribution.chunks(Grade::ALL.len()) {
        let mut cells = vec![Cell::new(&chunk[0].subject_code)];
        cells.extend(chunk.iter().map(|g| number(g.count)));
        table.add_row(cells);
    }
    println!("{table}");
}

#[cfg(feature = "web")]
fn write_svgs(dir: &std::path::Path, summary: &Summary) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    for spec in dashboard_charts(summary, &ChartLayout::default()) {
        let svg = exam_dashboard::graph::render_svg(&spec)?;
        let path = dir.join(format!("{}.svg", spec.id));
        std::fs::write(&path, svg)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(not(feature = "web"))]
fn write_svgs(_dir: &std::path::Path, _summary: &Summary) -> Result<(), Box<dyn std::error::Error>> {
    Err("SVG output needs the `web` feature".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let records = loader::load_path(&args.file)?;
    info!("Loaded {} records from {}", records.len(), args.file.display());
    let summary = Summary::from_records(&records);

    print_summary(&summary);

    if let Some(path) = &args.xlsx {
        std::fs::write(path, downloader::to_xlsx(&summary)?)?;
        info!("Wrote {}", path.display());
    }

    if args.vega_lite {
        let specs: Vec<serde_json::Value> = dashboard_charts(&summary, &ChartLayout::default())
            .iter()
            .map(|spec| spec.to_vega_lite())
            .collect();
        println!("{}", serde_json::to_string_pretty(&specs)?);
    }

    if let Some(dir) = &args.svg_dir {
        write_svgs(dir, &summary)?;
    }

    Ok(())
}
