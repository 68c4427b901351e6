#![cfg(feature = "web")]
use crate::chart::{ChartLayout, dashboard_charts};
use crate::graph::render_svg;
use crate::summary::Summary;
use handlebars::{Handlebars, RenderError, TemplateError};
use log::{debug, warn};
use serde::Serialize;

const PAGE: &str = "page";

/// One chart section of the report page
#[derive(Serialize)]
struct ChartBlock {
    id: String,
    title: String,
    svg: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    file_name: &'a str,
    record_count: usize,
    subject_count: usize,
    department_count: usize,
    generated_at: String,
    charts: Vec<ChartBlock>,
}

#[derive(Serialize)]
struct Page<'a> {
    error: Option<&'a str>,
    report: Option<Report<'a>>,
}

/// Renders the upload form and the chart report as HTML
pub struct Dashboard {
    templates: Handlebars<'static>,
}

impl Dashboard {
    pub fn new() -> Result<Self, TemplateError> {
        let mut templates = Handlebars::new();
        templates.register_template_string(PAGE, include_str!("./static/dashboard.html"))?;
        Ok(Self { templates })
    }

    /// The upload form on its own, with an optional error banner
    pub fn render_upload_page(&self, error: Option<&str>) -> Result<String, RenderError> {
        self.templates.render(PAGE, &Page { error, report: None })
    }

    /// The upload form followed by the four dashboard charts
    ///
    /// A chart that fails to draw is replaced by its error message so the
    /// rest of the report still renders.
    pub fn render_report(
        &self,
        file_name: &str,
        summary: &Summary,
        layout: &ChartLayout,
    ) -> Result<String, RenderError> {
        let charts = dashboard_charts(summary, layout)
            .into_iter()
            .map(|spec| match render_svg(&spec) {
                Ok(svg) => {
                    debug!("Rendered chart {} ({} bytes)", spec.id, svg.len());
                    ChartBlock {
                        id: spec.id,
                        title: spec.title,
                        svg: Some(svg),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Failed to render chart {}: {}", spec.id, e);
                    ChartBlock {
                        id: spec.id,
                        title: spec.title,
                        svg: None,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let report = Report {
            file_name,
            record_count: summary.record_count,
            subject_count: summary.subject_results.rows.len(),
            department_count: summary.department_results.rows.len(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            charts,
        };

        self.templates.render(
            PAGE,
            &Page {
                error: None,
                report: Some(report),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    #[test]
    fn upload_page_shows_error_banner() {
        let dashboard = Dashboard::new().unwrap();
        let html = dashboard
            .render_upload_page(Some("Missing required column(s): TOTAL"))
            .unwrap();
        assert!(html.contains("name=\"file\""));
        assert!(html.contains("Missing required column(s): TOTAL"));
        assert!(!html.contains("class=\"panel chart-block\""));
    }

    #[test]
    fn upload_page_escapes_error_text() {
        let dashboard = Dashboard::new().unwrap();
        let html = dashboard.render_upload_page(Some("<script>")).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn report_lists_charts_in_order() {
        let dashboard = Dashboard::new().unwrap();
        let summary = Summary::from_records(&[
            Record::new("CS101", "CSE", 30.0, 60.0, 90.0),
            Record::new("MA201", "ECE", 10.0, 30.0, 40.0),
        ]);
        let html = dashboard
            .render_report("marks.xlsx", &summary, &ChartLayout::default())
            .unwrap();

        let titles = [
            "Subject-wise Pass/Fail Count",
            "Department-wise Pass/Fail Count",
            "Average Marks per Subject",
            "Subject-wise Grade Distribution",
        ];
        let positions: Vec<usize> = titles
            .iter()
            .map(|t| html.find(t).expect("chart title missing"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(html.contains("marks.xlsx"));
        assert_eq!(html.matches("class=\"panel chart-block\"").count(), 4);
    }
}
