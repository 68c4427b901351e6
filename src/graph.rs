#![cfg(feature = "web")]
use crate::chart::{ChartSpec, Datum, Orientation};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::error::Error;

/// Share of a category slot covered by its bars
const GROUP_WIDTH: f64 = 0.8;

/// Colour used when a series has no palette entry
const FALLBACK_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Position of one bar along the categorical axis
#[derive(Clone, Debug, PartialEq)]
pub struct BarSlot<'a> {
    pub datum: &'a Datum,

    /// Index of the series in the colour domain
    pub series: Option<usize>,

    /// Centre of the bar in category units
    pub center: f64,
    pub half_width: f64,
}

impl BarSlot<'_> {
    pub fn start(&self) -> f64 {
        self.center - self.half_width
    }

    pub fn end(&self) -> f64 {
        self.center + self.half_width
    }
}

/// Renders a chart spec to an SVG document
///
/// Vertical charts draw grouped bars with a legend, horizontal charts draw
/// one bar per category. A faceted spec gets one panel per facet value,
/// stacked top to bottom, all sharing the same value scale.
///
/// # Arguments
/// * `spec` - The chart to draw
///
/// # Returns
/// * A Result containing the SVG markup or an error
///
/// # Examples
/// ```no_run
/// use exam_dashboard::chart::{subject_results_chart, ChartLayout};
/// use exam_dashboard::graph::render_svg;
/// use exam_dashboard::summary::Summary;
///
/// let spec = subject_results_chart(&Summary::from_records(&[]), &ChartLayout::default());
/// match render_svg(&spec) {
///     Ok(svg) => println!("Chart rendered: {} bytes", svg.len()),
///     Err(e) => eprintln!("Failed to render chart: {}", e),
/// }
/// ```
pub fn render_svg(spec: &ChartSpec) -> Result<String, Box<dyn Error>> {
    let facets = spec.facets();
    let panels = facets.len().max(1) as u32;
    let spacing = spec.facet.as_ref().map(|f| f.spacing).unwrap_or(0);
    let height = spec.height * panels + spacing * (panels - 1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (spec.width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        if facets.is_empty() {
            draw_panel(&root, spec, None)?;
        } else {
            let areas = root.split_evenly((facets.len(), 1));
            for (area, facet) in areas.iter().zip(facets.iter().copied()) {
                draw_panel(area, spec, Some(facet))?;
            }
        }

        root.present()?;
    }

    Ok(svg)
}

/// Computes where every bar of a panel sits on the categorical axis
///
/// Categories sit at integer positions. With offset grouping the slot is
/// split evenly between the series of the colour domain. Horizontal charts
/// count positions from the top so the first category is drawn highest.
pub fn layout_bars<'a>(spec: &'a ChartSpec, facet: Option<&'a str>) -> Vec<BarSlot<'a>> {
    let categories = spec.categories();
    let n = categories.len();
    let series_count = spec.color.domain.len().max(1) as f64;

    spec.panel_data(facet)
        .filter_map(|datum| {
            let index = categories.iter().position(|c| *c == datum.category)?;
            let position = match spec.orientation {
                Orientation::Vertical => index as f64,
                Orientation::Horizontal => (n - 1 - index) as f64,
            };
            let series = spec.series_index(&datum.series);

            let (center, half_width) = match (spec.offset, series) {
                (true, Some(s)) => {
                    let slot = GROUP_WIDTH / series_count;
                    (position - GROUP_WIDTH / 2.0 + slot * (s as f64 + 0.5), slot / 2.0)
                }
                _ => (position, GROUP_WIDTH / 2.0),
            };

            Some(BarSlot {
                datum,
                series,
                center,
                half_width,
            })
        })
        .collect()
}

/// Parses a "#RRGGBB" colour
pub fn parse_hex(color: &str) -> Option<RGBColor> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn series_color(spec: &ChartSpec, series: usize) -> RGBColor {
    spec.color
        .range
        .get(series)
        .and_then(|c| parse_hex(c))
        .unwrap_or(FALLBACK_COLOR)
}

fn value_ceiling(spec: &ChartSpec) -> f64 {
    let max = spec.data.iter().map(|d| d.value).fold(0.0, f64::max);
    // Headroom for the labels above the tallest bar
    if max > 0.0 { max * 1.15 } else { 1.0 }
}

/// Name of the category at an axis position, blank between categories
fn category_at(categories: &[&str], position: f64, reversed: bool) -> String {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    let index = rounded as usize;
    let index = if reversed {
        match categories.len().checked_sub(index + 1) {
            Some(i) => i,
            None => return String::new(),
        }
    } else {
        index
    };
    categories.get(index).map(|c| c.to_string()).unwrap_or_default()
}

fn label_style(spec: &ChartSpec, h: HPos, v: VPos) -> TextStyle<'static> {
    FontDesc::new(
        FontFamily::SansSerif,
        spec.labels.font_size as f64,
        FontStyle::Bold,
    )
    .color(&BLACK)
    .pos(Pos::new(h, v))
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    spec: &ChartSpec,
    facet: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let caption = match (&spec.facet, facet) {
        (Some(f), Some(value)) => Some(format!("{}: {}", f.title, value)),
        _ => None,
    };
    let bars = layout_bars(spec, facet);

    match spec.orientation {
        Orientation::Vertical => draw_vertical(area, spec, &bars, caption.as_deref()),
        Orientation::Horizontal => draw_horizontal(area, spec, &bars, caption.as_deref()),
    }
}

fn draw_vertical(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    spec: &ChartSpec,
    bars: &[BarSlot<'_>],
    caption: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let categories = spec.categories();
    let n = categories.len().max(1) as f64;

    let mut builder = ChartBuilder::on(area);
    builder.margin(10).x_label_area_size(40).y_label_area_size(50);
    if let Some(caption) = caption {
        builder.caption(caption, ("sans-serif", 18).into_font());
    }
    let mut chart = builder.build_cartesian_2d(-0.5..n - 0.5, 0.0..value_ceiling(spec))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len().max(1))
        .x_label_formatter(&|x| category_at(&categories, *x, false))
        .x_desc(&spec.category.title)
        .y_desc(&spec.value.title)
        .draw()?;

    for (index, series) in spec.color.domain.iter().enumerate() {
        let color = series_color(spec, index);
        let rects = bars
            .iter()
            .filter(|b| b.series == Some(index))
            .map(|b| Rectangle::new([(b.start(), 0.0), (b.end(), b.datum.value)], color.filled()));

        let drawn = chart.draw_series(rects)?;
        if spec.color.legend {
            drawn
                .label(series.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }

    let style = label_style(spec, HPos::Center, VPos::Bottom);
    chart.draw_series(bars.iter().filter_map(|b| {
        let text = spec.label_for(b.datum.value)?;
        Some(EmptyElement::at((b.center, b.datum.value)) + Text::new(text, (0, -5), style.clone()))
    }))?;

    if spec.color.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    Ok(())
}

fn draw_horizontal(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    spec: &ChartSpec,
    bars: &[BarSlot<'_>],
    caption: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let categories = spec.categories();
    let n = categories.len().max(1) as f64;

    let mut builder = ChartBuilder::on(area);
    builder.margin(10).x_label_area_size(30).y_label_area_size(50);
    if let Some(caption) = caption {
        builder.caption(caption, ("sans-serif", 16).into_font());
    }
    let mut chart = builder.build_cartesian_2d(0.0..value_ceiling(spec), -0.5..n - 0.5)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(categories.len().max(1))
        .y_label_formatter(&|y| category_at(&categories, *y, true))
        .x_desc(&spec.value.title)
        .y_desc(&spec.category.title)
        .draw()?;

    chart.draw_series(bars.iter().map(|b| {
        let color = b.series.map(|s| series_color(spec, s)).unwrap_or(FALLBACK_COLOR);
        Rectangle::new([(0.0, b.start()), (b.datum.value, b.end())], color.filled())
    }))?;

    let style = label_style(spec, HPos::Left, VPos::Center);
    chart.draw_series(bars.iter().filter_map(|b| {
        let text = spec.label_for(b.datum.value)?;
        Some(EmptyElement::at((b.datum.value, b.center)) + Text::new(text, (3, 0), style.clone()))
    }))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{
        ChartLayout, grade_distribution_chart, subject_averages_chart, subject_results_chart,
    };
    use crate::record::Record;
    use crate::summary::Summary;

    fn summary() -> Summary {
        Summary::from_records(&[
            Record::new("CS101", "CSE", 30.0, 60.0, 90.0),
            Record::new("CS101", "ECE", 20.0, 44.0, 64.0),
            Record::new("MA201", "ECE", 15.0, 47.0, 62.0),
        ])
    }

    #[test]
    fn parses_palette_colours() {
        assert_eq!(parse_hex("#90EE90"), Some(RGBColor(0x90, 0xEE, 0x90)));
        assert_eq!(parse_hex("#1f77b4"), Some(RGBColor(0x1f, 0x77, 0xb4)));
        assert_eq!(parse_hex("90EE90"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#GG0000"), None);
    }

    #[test]
    fn grouped_bars_share_the_category_slot() {
        let spec = subject_results_chart(&summary(), &ChartLayout::default());
        let bars = layout_bars(&spec, None);
        assert_eq!(bars.len(), 4);

        let cs: Vec<&BarSlot> = bars.iter().filter(|b| b.datum.category == "CS101").collect();
        assert_eq!(cs[0].series, Some(0));
        assert_eq!(cs[1].series, Some(1));
        assert!((cs[0].start() - -0.4).abs() < 1e-9);
        assert!((cs[0].end() - cs[1].start()).abs() < 1e-9);
        assert!((cs[1].end() - 0.4).abs() < 1e-9);

        let ma = bars.iter().find(|b| b.datum.category == "MA201").unwrap();
        assert!(ma.center > 0.5 && ma.center < 1.0);
    }

    #[test]
    fn three_series_split_slot_in_thirds() {
        let spec = subject_averages_chart(&summary(), &ChartLayout::default());
        let bars = layout_bars(&spec, None);
        let widths: Vec<f64> = bars.iter().map(|b| b.end() - b.start()).collect();
        assert!(widths.iter().all(|w| (w - GROUP_WIDTH / 3.0).abs() < 1e-9));
    }

    #[test]
    fn horizontal_bars_put_first_grade_on_top() {
        let spec = grade_distribution_chart(&summary(), &ChartLayout::default());
        let bars = layout_bars(&spec, Some("CS101"));
        assert_eq!(bars.len(), 7);
        let top = bars.iter().find(|b| b.datum.category == "O").unwrap();
        let bottom = bars.iter().find(|b| b.datum.category == "U").unwrap();
        assert_eq!(top.center, 6.0);
        assert_eq!(bottom.center, 0.0);
    }

    #[test]
    fn category_positions_map_to_names() {
        let categories = ["CS101", "MA201"];
        assert_eq!(category_at(&categories, 0.0, false), "CS101");
        assert_eq!(category_at(&categories, 1.0, false), "MA201");
        assert_eq!(category_at(&categories, 0.5, false), "");
        assert_eq!(category_at(&categories, 2.0, false), "");
        assert_eq!(category_at(&categories, -1.0, false), "");
        assert_eq!(category_at(&categories, 0.0, true), "MA201");
        assert_eq!(category_at(&categories, 2.0, true), "");
    }

    #[test]
    #[ignore = "text layout needs a system sans-serif font"]
    fn renders_svg_documents() {
        let spec = grade_distribution_chart(&summary(), &ChartLayout::default());
        let svg = render_svg(&spec).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Subject: CS101"));
    }
}
