use crate::loader::{EXTERNAL, INTERNAL, SUBJECT_CODE, TOTAL};
use crate::record::{Grade, Outcome};
use crate::summary::{ResultTable, Summary};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Pass bar colour ("lightgreen")
pub const PASS_COLOR: &str = "#90EE90";

/// Fail bar colour ("lightcoral")
pub const FAIL_COLOR: &str = "#F08080";

/// Bar colours for the INTERNAL, EXTERNAL and TOTAL averages
pub const AVERAGE_COLORS: [&str; 3] = ["#4682B4", "#8B0000", "#228B22"];

/// Bar colours for the grades O through U
pub const GRADE_COLORS: [&str; 7] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
];

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Which axis carries the categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Categories on the x axis, bars grow upwards
    Vertical,

    /// Categories on the y axis, bars grow to the right
    Horizontal,
}

/// Binding of a data field to an axis
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Axis {
    /// Field name in the data rows
    pub field: String,

    /// Axis title
    pub title: String,

    /// Rotation of the tick labels in degrees
    pub label_angle: Option<i32>,

    /// Explicit category order; data order is used when absent
    pub sort: Option<Vec<String>>,
}

impl Axis {
    fn new(field: &str, title: &str) -> Self {
        Self {
            field: field.to_string(),
            title: title.to_string(),
            label_angle: None,
            sort: None,
        }
    }
}

/// Categorical colour encoding with a fixed palette
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorScale {
    pub field: String,
    pub domain: Vec<String>,
    pub range: Vec<String>,
    pub legend: bool,
}

/// How numbers are written on top of the bars
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelSpec {
    /// Decimal places shown; the underlying value is never rounded
    pub decimals: usize,

    /// Leave the label out when the value is 0
    pub hide_zero: bool,

    pub font_size: u32,
}

/// Splits a chart into one panel per value of `field`, stacked in rows
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Facet {
    pub field: String,
    pub title: String,
    pub spacing: u32,
}

/// One bar of a chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Datum {
    /// Position on the categorical axis
    pub category: String,

    /// Colour group, also used for side-by-side offset
    pub series: String,

    /// Bar length at full precision
    pub value: f64,

    /// Facet panel this bar belongs to
    pub facet: Option<String>,
}

/// Chart sizes used by the dashboard builders
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChartLayout {
    pub width: u32,
    pub height: u32,

    /// Size of each panel of a faceted chart
    pub facet_width: u32,
    pub facet_height: u32,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            facet_width: 600,
            facet_height: 150,
        }
    }
}

/// Declarative description of a bar chart
///
/// A spec is plain data: it is rebuilt from the aggregate tables on every
/// upload and can be drawn by the SVG renderer or handed to any charting
/// library through [`ChartSpec::to_vega_lite`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Stable identifier, also used as the export file stem
    pub id: String,
    pub title: String,
    pub orientation: Orientation,

    /// Categorical axis (x for vertical charts, y for horizontal ones)
    pub category: Axis,

    /// Quantitative axis
    pub value: Axis,
    pub color: ColorScale,

    /// Place the series of one category side by side
    pub offset: bool,
    pub bar_width: Option<u32>,
    pub labels: LabelSpec,
    pub facet: Option<Facet>,

    /// Size of the chart, or of each panel when faceted
    pub width: u32,
    pub height: u32,
    pub data: Vec<Datum>,
}

impl ChartSpec {
    /// Text drawn next to a bar of the given value, if any
    ///
    /// # Examples
    /// ```
    /// use exam_dashboard::chart::{subject_averages_chart, ChartLayout};
    /// use exam_dashboard::summary::Summary;
    ///
    /// let spec = subject_averages_chart(&Summary::from_records(&[]), &ChartLayout::default());
    /// assert_eq!(spec.label_for(66.666), Some("66.67".to_string()));
    /// ```
    pub fn label_for(&self, value: f64) -> Option<String> {
        if self.labels.hide_zero && value == 0.0 {
            return None;
        }
        Some(format!("{:.*}", self.labels.decimals, value))
    }

    /// Categories in axis order
    pub fn categories(&self) -> Vec<&str> {
        match &self.category.sort {
            Some(order) => order.iter().map(String::as_str).collect(),
            None => distinct(self.data.iter().map(|d| d.category.as_str())),
        }
    }

    /// Facet values in panel order (empty for unfaceted charts)
    pub fn facets(&self) -> Vec<&str> {
        distinct(self.data.iter().filter_map(|d| d.facet.as_deref()))
    }

    /// Bars belonging to one facet panel (all bars when `facet` is `None`)
    pub fn panel_data<'a>(&'a self, facet: Option<&'a str>) -> impl Iterator<Item = &'a Datum> + 'a {
        self.data
            .iter()
            .filter(move |d| facet.is_none() || d.facet.as_deref() == facet)
    }

    /// Position of a series within the colour domain
    pub fn series_index(&self, series: &str) -> Option<usize> {
        self.color.domain.iter().position(|s| s == series)
    }

    /// Palette colour of a series
    pub fn color_for(&self, series: &str) -> Option<&str> {
        self.series_index(series)
            .and_then(|i| self.color.range.get(i))
            .map(String::as_str)
    }

    /// Serializes the spec as a Vega-Lite v5 document
    ///
    /// Bars and their labels are two layers sharing the same encodings. A
    /// faceted spec wraps the layers in a row facet.
    pub fn to_vega_lite(&self) -> Value {
        let values: Vec<Value> = self.data.iter().map(|d| self.datum_json(d)).collect();
        let layer = json!([
            { "mark": self.bar_mark(), "encoding": self.bar_encoding() },
            { "mark": self.text_mark(), "encoding": self.text_encoding() },
        ]);

        match &self.facet {
            Some(facet) => json!({
                "$schema": VEGA_LITE_SCHEMA,
                "title": self.title,
                "data": { "values": values },
                "facet": {
                    "row": { "field": facet.field, "type": "nominal", "title": facet.title }
                },
                "spacing": facet.spacing,
                "spec": {
                    "width": self.width,
                    "height": self.height,
                    "layer": layer,
                },
            }),
            None => json!({
                "$schema": VEGA_LITE_SCHEMA,
                "title": self.title,
                "data": { "values": values },
                "width": self.width,
                "height": self.height,
                "layer": layer,
            }),
        }
    }

    fn datum_json(&self, datum: &Datum) -> Value {
        let mut row = Map::new();
        row.insert(self.color.field.clone(), json!(datum.series));
        row.insert(self.category.field.clone(), json!(datum.category));
        row.insert(self.value.field.clone(), json!(datum.value));
        if let (Some(facet), Some(value)) = (&self.facet, &datum.facet) {
            row.insert(facet.field.clone(), json!(value));
        }
        Value::Object(row)
    }

    fn bar_mark(&self) -> Value {
        let mut mark = json!({ "type": "bar" });
        if let Some(width) = self.bar_width {
            mark["width"] = json!(width);
        }
        mark
    }

    fn text_mark(&self) -> Value {
        match self.orientation {
            Orientation::Vertical => json!({
                "type": "text", "align": "center", "baseline": "bottom", "dy": -5,
                "fontSize": self.labels.font_size, "fontWeight": "bold", "color": "black",
            }),
            Orientation::Horizontal => json!({
                "type": "text", "align": "left", "baseline": "middle", "dx": 3,
                "fontSize": self.labels.font_size, "fontWeight": "bold", "color": "black",
            }),
        }
    }

    fn position_encoding(&self) -> Map<String, Value> {
        let mut category = json!({
            "field": self.category.field,
            "type": "nominal",
            "title": self.category.title,
        });
        if let Some(angle) = self.category.label_angle {
            category["axis"] = json!({ "labelAngle": angle });
        }
        if let Some(order) = &self.category.sort {
            category["sort"] = json!(order);
        }
        let value = json!({
            "field": self.value.field,
            "type": "quantitative",
            "title": self.value.title,
        });

        let mut encoding = Map::new();
        match self.orientation {
            Orientation::Vertical => {
                encoding.insert("x".into(), category);
                encoding.insert("y".into(), value);
                if self.offset {
                    encoding.insert(
                        "xOffset".into(),
                        json!({ "field": self.color.field, "type": "nominal", "sort": self.color.domain }),
                    );
                }
            }
            Orientation::Horizontal => {
                encoding.insert("y".into(), category);
                encoding.insert("x".into(), value);
                if self.offset {
                    encoding.insert(
                        "yOffset".into(),
                        json!({ "field": self.color.field, "type": "nominal", "sort": self.color.domain }),
                    );
                }
            }
        }
        encoding
    }

    fn bar_encoding(&self) -> Value {
        let mut encoding = self.position_encoding();
        let mut color = json!({
            "field": self.color.field,
            "type": "nominal",
            "scale": { "domain": self.color.domain, "range": self.color.range },
        });
        color["legend"] = if self.color.legend {
            json!({ "title": self.color.field })
        } else {
            Value::Null
        };
        encoding.insert("color".into(), color);
        Value::Object(encoding)
    }

    fn text_encoding(&self) -> Value {
        let mut encoding = self.position_encoding();
        let mut text = json!({ "field": self.value.field, "type": "quantitative" });
        if self.labels.decimals > 0 {
            text["format"] = json!(format!(".{}f", self.labels.decimals));
        }
        if self.labels.hide_zero {
            text = json!({
                "condition": {
                    "test": format!("datum['{}'] > 0", self.value.field),
                    "field": self.value.field,
                    "type": "quantitative",
                },
                "value": "",
            });
        }
        encoding.insert("text".into(), text);
        Value::Object(encoding)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn result_chart(
    id: &str,
    title: &str,
    key_field: &str,
    key_title: &str,
    table: &ResultTable,
    layout: &ChartLayout,
) -> ChartSpec {
    let data = table
        .rows
        .iter()
        .flat_map(|row| {
            Outcome::ALL.into_iter().map(move |outcome| Datum {
                category: row.key.clone(),
                series: outcome.label().to_string(),
                value: row.count(outcome) as f64,
                facet: None,
            })
        })
        .collect();

    let mut category = Axis::new(key_field, key_title);
    category.label_angle = Some(-45);

    ChartSpec {
        id: id.to_string(),
        title: title.to_string(),
        orientation: Orientation::Vertical,
        category,
        value: Axis::new("Count", "Student Count"),
        color: ColorScale {
            field: "Result".to_string(),
            domain: Outcome::ALL.iter().map(|o| o.label().to_string()).collect(),
            range: vec![PASS_COLOR.to_string(), FAIL_COLOR.to_string()],
            legend: true,
        },
        offset: true,
        bar_width: Some(30),
        labels: LabelSpec {
            decimals: 0,
            hide_zero: false,
            font_size: 16,
        },
        facet: None,
        width: layout.width,
        height: layout.height,
        data,
    }
}

/// Pass/fail counts per subject, bars side by side
pub fn subject_results_chart(summary: &Summary, layout: &ChartLayout) -> ChartSpec {
    result_chart(
        "subject-results",
        "Subject-wise Pass/Fail Count",
        SUBJECT_CODE,
        "Subjects",
        &summary.subject_results,
        layout,
    )
}

/// Pass/fail counts per department, bars side by side
pub fn department_results_chart(summary: &Summary, layout: &ChartLayout) -> ChartSpec {
    result_chart(
        "department-results",
        "Department-wise Pass/Fail Count",
        "DEPARTMENT",
        "Departments",
        &summary.department_results,
        layout,
    )
}

/// Average internal, external and total marks per subject
///
/// Labels are rounded to two decimals; the data keeps the exact means.
pub fn subject_averages_chart(summary: &Summary, layout: &ChartLayout) -> ChartSpec {
    let columns = [INTERNAL, EXTERNAL, TOTAL];
    let data = summary
        .subject_averages
        .iter()
        .flat_map(|row| {
            [row.internal, row.external, row.total]
                .into_iter()
                .zip(columns)
                .map(move |(value, column)| Datum {
                    category: row.subject_code.clone(),
                    series: column.to_string(),
                    value,
                    facet: None,
                })
        })
        .collect();

    let mut category = Axis::new(SUBJECT_CODE, "Subjects");
    category.label_angle = Some(-45);

    ChartSpec {
        id: "subject-averages".to_string(),
        title: "Average Marks per Subject".to_string(),
        orientation: Orientation::Vertical,
        category,
        value: Axis::new("Average Marks", "Average Marks"),
        color: ColorScale {
            field: "Category".to_string(),
            domain: columns.iter().map(|c| c.to_string()).collect(),
            range: AVERAGE_COLORS.iter().map(|c| c.to_string()).collect(),
            legend: true,
        },
        offset: true,
        bar_width: Some(20),
        labels: LabelSpec {
            decimals: 2,
            hide_zero: false,
            font_size: 12,
        },
        facet: None,
        width: layout.width,
        height: layout.height,
        data,
    }
}

/// Grade counts per subject, one horizontal panel per subject
///
/// Every panel lists all seven grades; empty grades get a zero-length bar
/// and no label.
pub fn grade_distribution_chart(summary: &Summary, layout: &ChartLayout) -> ChartSpec {
    let data = summary
        .grade_distribution
        .iter()
        .map(|row| Datum {
            category: row.grade.label().to_string(),
            series: row.grade.label().to_string(),
            value: row.count as f64,
            facet: Some(row.subject_code.clone()),
        })
        .collect();

    let grades: Vec<String> = Grade::ALL.iter().map(|g| g.label().to_string()).collect();
    let mut category = Axis::new("Grade", "Grade");
    category.sort = Some(grades.clone());

    ChartSpec {
        id: "grade-distribution".to_string(),
        title: "Subject-wise Grade Distribution".to_string(),
        orientation: Orientation::Horizontal,
        category,
        value: Axis::new("Count", "Number of Students"),
        color: ColorScale {
            field: "Grade".to_string(),
            domain: grades,
            range: GRADE_COLORS.iter().map(|c| c.to_string()).collect(),
            legend: false,
        },
        offset: false,
        bar_width: None,
        labels: LabelSpec {
            decimals: 0,
            hide_zero: true,
            font_size: 14,
        },
        facet: Some(Facet {
            field: SUBJECT_CODE.to_string(),
            title: "Subject".to_string(),
            spacing: 10,
        }),
        width: layout.facet_width,
        height: layout.facet_height,
        data,
    }
}

/// The four dashboard charts in display order
pub fn dashboard_charts(summary: &Summary, layout: &ChartLayout) -> Vec<ChartSpec> {
    vec![
        subject_results_chart(summary, layout),
        department_results_chart(summary, layout),
        subject_averages_chart(summary, layout),
        grade_distribution_chart(summary, layout),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn summary() -> Summary {
        Summary::from_records(&[
            Record::new("CS101", "CSE", 30.0, 60.0, 90.0),
            Record::new("CS101", "CSE", 20.0, 44.0, 64.0),
            Record::new("CS101", "ECE", 25.0, 50.0, 75.0),
            Record::new("MA201", "ECE", 10.0, 30.0, 40.0),
            Record::new("MA201", "CSE", 35.0, 58.0, 93.0),
            Record::new("MA201", "CSE", 15.0, 20.0, 35.0),
        ])
    }

    #[test]
    fn dashboard_has_four_charts_in_order() {
        let ids: Vec<String> = dashboard_charts(&summary(), &ChartLayout::default())
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(
            ids,
            vec!["subject-results", "department-results", "subject-averages", "grade-distribution"]
        );
    }

    #[test]
    fn subject_chart_groups_sum_to_record_counts() {
        let spec = subject_results_chart(&summary(), &ChartLayout::default());
        assert_eq!(spec.categories(), vec!["CS101", "MA201"]);
        for subject in spec.categories() {
            let bars: Vec<&Datum> = spec.data.iter().filter(|d| d.category == subject).collect();
            assert_eq!(bars.len(), 2);
            let sum: f64 = bars.iter().map(|d| d.value).sum();
            assert_eq!(sum, 3.0);
        }
        assert_eq!(spec.color_for("Pass"), Some(PASS_COLOR));
        assert_eq!(spec.color_for("Fail"), Some(FAIL_COLOR));
        assert_eq!(spec.series_index("Fail"), Some(1));
    }

    #[test]
    fn average_labels_round_but_data_keeps_precision() {
        let records = [
            Record::new("CS101", "CSE", 10.0, 50.0, 60.0),
            Record::new("CS101", "CSE", 11.0, 51.0, 61.0),
            Record::new("CS101", "CSE", 11.0, 51.0, 61.0),
        ];
        let spec = subject_averages_chart(&Summary::from_records(&records), &ChartLayout::default());
        let internal = spec.data.iter().find(|d| d.series == INTERNAL).unwrap();
        assert_eq!(internal.value, 32.0 / 3.0);
        assert_eq!(spec.label_for(internal.value).as_deref(), Some("10.67"));
        assert_eq!(spec.label_for(0.0).as_deref(), Some("0.00"));
    }

    #[test]
    fn grade_chart_hides_zero_labels_and_facets_by_subject() {
        let spec = grade_distribution_chart(&summary(), &ChartLayout::default());
        assert_eq!(spec.facets(), vec!["CS101", "MA201"]);
        assert_eq!(spec.categories().len(), 7);
        assert_eq!(spec.panel_data(Some("CS101")).count(), 7);
        assert_eq!(spec.panel_data(None).count(), 14);
        assert_eq!(spec.label_for(0.0), None);
        assert_eq!(spec.label_for(2.0).as_deref(), Some("2"));
        assert_eq!((spec.width, spec.height), (600, 150));
    }

    #[test]
    fn result_chart_vega_lite_document() {
        let doc = subject_results_chart(&summary(), &ChartLayout::default()).to_vega_lite();
        assert_eq!(doc["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(doc["data"]["values"].as_array().unwrap().len(), 4);
        assert_eq!(doc["data"]["values"][0]["SUBJECT CODE"], "CS101");
        assert_eq!(doc["data"]["values"][0]["Result"], "Pass");
        assert_eq!(doc["data"]["values"][0]["Count"], 2.0);

        let bar = &doc["layer"][0];
        assert_eq!(bar["mark"]["width"], 30);
        assert_eq!(bar["encoding"]["x"]["axis"]["labelAngle"], -45);
        assert_eq!(bar["encoding"]["xOffset"]["field"], "Result");
        assert_eq!(bar["encoding"]["color"]["scale"]["range"][1], FAIL_COLOR);
        assert_eq!(doc["layer"][1]["encoding"]["text"]["field"], "Count");
    }

    #[test]
    fn faceted_vega_lite_document() {
        let doc = grade_distribution_chart(&summary(), &ChartLayout::default()).to_vega_lite();
        assert_eq!(doc["facet"]["row"]["field"], SUBJECT_CODE);
        assert_eq!(doc["spacing"], 10);
        assert_eq!(doc["spec"]["height"], 150);
        let bar = &doc["spec"]["layer"][0];
        assert_eq!(bar["encoding"]["y"]["sort"][1], "A+");
        assert!(bar["encoding"]["color"]["legend"].is_null());
        let text = &doc["spec"]["layer"][1]["encoding"]["text"];
        assert_eq!(text["condition"]["test"], "datum['Count'] > 0");
        assert_eq!(text["value"], "");
    }

    #[test]
    fn average_vega_lite_formats_two_decimals() {
        let doc = subject_averages_chart(&summary(), &ChartLayout::default()).to_vega_lite();
        assert_eq!(doc["layer"][1]["encoding"]["text"]["format"], ".2f");
        assert_eq!(doc["layer"][0]["encoding"]["xOffset"]["sort"][0], INTERNAL);
    }
}
