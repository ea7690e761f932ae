//! SVG line chart for stress-strain curves.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Result, StructeasyError};

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 6;

const LINE_COLOR: &str = "#45818e";
const GRID_COLOR: &str = "#e2e2e2";

/// Axis labels and title of a line chart
#[derive(Debug, Clone)]
pub struct ChartLabels<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
}

/// Maps data values onto the plot area
struct Scale {
    min: f64,
    max: f64,
    start: f64,
    end: f64,
}

impl Scale {
    fn new(values: &[f64], start: f64, end: f64) -> Scale {
        let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if (max - min).abs() < f64::EPSILON {
            let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
            min -= pad;
            max += pad;
        }
        Scale {
            min,
            max,
            start,
            end,
        }
    }

    fn map(&self, value: f64) -> f64 {
        self.start + (value - self.min) / (self.max - self.min) * (self.end - self.start)
    }

    fn ticks(&self) -> Vec<f64> {
        (0..TICKS)
            .map(|i| self.min + (self.max - self.min) * i as f64 / (TICKS - 1) as f64)
            .collect()
    }
}

fn xml_error<E: std::fmt::Display>(err: E) -> StructeasyError {
    StructeasyError::Plot(format!("Failed to write svg: {err}"))
}

fn write_empty(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: &[(&str, String)],
) -> Result<()> {
    let mut element = BytesStart::new(name);
    for (key, value) in attributes {
        element.push_attribute((*key, value.as_str()));
    }
    writer.write_event(Event::Empty(element)).map_err(xml_error)
}

fn write_text(
    writer: &mut Writer<Vec<u8>>,
    attributes: &[(&str, String)],
    content: &str,
) -> Result<()> {
    let mut element = BytesStart::new("text");
    for (key, value) in attributes {
        element.push_attribute((*key, value.as_str()));
    }
    writer.write_event(Event::Start(element)).map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(content)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("text")))
        .map_err(xml_error)
}

fn format_tick(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    if value.abs() < 1e-2 || value.abs() >= 1e5 {
        return format!("{value:.2e}");
    }
    let fixed = format!("{value:.3}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_owned()
}

/// Renders `y(x)` as an SVG line chart with a dashed grid
///
/// # Arguments
/// * `x` - The abscissae
/// * `y` - The ordinates, as many as `x`
/// * `labels` - Title and axis labels
///
/// # Returns
/// The SVG document
pub fn line_chart_svg(x: &[f64], y: &[f64], labels: &ChartLabels) -> Result<String> {
    if x.is_empty() || x.len() != y.len() {
        return Err(StructeasyError::Plot(format!(
            "Cannot chart {} x values against {} y values",
            x.len(),
            y.len()
        )));
    }

    let x_scale = Scale::new(x, MARGIN_LEFT, WIDTH - MARGIN_RIGHT);
    let y_scale = Scale::new(y, HEIGHT - MARGIN_BOTTOM, MARGIN_TOP);

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut svg = BytesStart::new("svg");
    svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    svg.push_attribute(("width", WIDTH.to_string().as_str()));
    svg.push_attribute(("height", HEIGHT.to_string().as_str()));
    svg.push_attribute(("viewBox", format!("0 0 {WIDTH} {HEIGHT}").as_str()));
    svg.push_attribute(("font-family", "Arial, sans-serif"));
    writer.write_event(Event::Start(svg)).map_err(xml_error)?;

    write_empty(
        &mut writer,
        "rect",
        &[
            ("width", WIDTH.to_string()),
            ("height", HEIGHT.to_string()),
            ("fill", "white".to_owned()),
        ],
    )?;

    // grid and tick labels
    for tick in x_scale.ticks() {
        let px = format!("{:.2}", x_scale.map(tick));
        write_empty(
            &mut writer,
            "line",
            &[
                ("x1", px.clone()),
                ("y1", MARGIN_TOP.to_string()),
                ("x2", px.clone()),
                ("y2", (HEIGHT - MARGIN_BOTTOM).to_string()),
                ("stroke", GRID_COLOR.to_owned()),
                ("stroke-dasharray", "4 3".to_owned()),
            ],
        )?;
        write_text(
            &mut writer,
            &[
                ("x", px),
                ("y", (HEIGHT - MARGIN_BOTTOM + 18.0).to_string()),
                ("font-size", "11".to_owned()),
                ("text-anchor", "middle".to_owned()),
            ],
            &format_tick(tick),
        )?;
    }
    for tick in y_scale.ticks() {
        let py = format!("{:.2}", y_scale.map(tick));
        write_empty(
            &mut writer,
            "line",
            &[
                ("x1", MARGIN_LEFT.to_string()),
                ("y1", py.clone()),
                ("x2", (WIDTH - MARGIN_RIGHT).to_string()),
                ("y2", py.clone()),
                ("stroke", GRID_COLOR.to_owned()),
                ("stroke-dasharray", "4 3".to_owned()),
            ],
        )?;
        write_text(
            &mut writer,
            &[
                ("x", (MARGIN_LEFT - 8.0).to_string()),
                ("y", py),
                ("font-size", "11".to_owned()),
                ("text-anchor", "end".to_owned()),
                ("dominant-baseline", "middle".to_owned()),
            ],
            &format_tick(tick),
        )?;
    }

    write_empty(
        &mut writer,
        "rect",
        &[
            ("x", MARGIN_LEFT.to_string()),
            ("y", MARGIN_TOP.to_string()),
            ("width", (WIDTH - MARGIN_LEFT - MARGIN_RIGHT).to_string()),
            ("height", (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM).to_string()),
            ("fill", "none".to_owned()),
            ("stroke", "#333333".to_owned()),
        ],
    )?;

    let points: Vec<String> = x
        .iter()
        .zip(y)
        .map(|(xv, yv)| format!("{:.2},{:.2}", x_scale.map(*xv), y_scale.map(*yv)))
        .collect();
    write_empty(
        &mut writer,
        "polyline",
        &[
            ("points", points.join(" ")),
            ("fill", "none".to_owned()),
            ("stroke", LINE_COLOR.to_owned()),
            ("stroke-width", "1.5".to_owned()),
        ],
    )?;

    write_text(
        &mut writer,
        &[
            ("x", (WIDTH / 2.0).to_string()),
            ("y", (MARGIN_TOP / 2.0).to_string()),
            ("font-size", "15".to_owned()),
            ("text-anchor", "middle".to_owned()),
        ],
        labels.title,
    )?;
    write_text(
        &mut writer,
        &[
            ("x", ((MARGIN_LEFT + WIDTH - MARGIN_RIGHT) / 2.0).to_string()),
            ("y", (HEIGHT - 15.0).to_string()),
            ("font-size", "13".to_owned()),
            ("text-anchor", "middle".to_owned()),
        ],
        labels.x_label,
    )?;
    let y_mid = (MARGIN_TOP + HEIGHT - MARGIN_BOTTOM) / 2.0;
    write_text(
        &mut writer,
        &[
            ("x", "20".to_owned()),
            ("y", y_mid.to_string()),
            ("font-size", "13".to_owned()),
            ("text-anchor", "middle".to_owned()),
            ("transform", format!("rotate(-90 20 {y_mid})")),
        ],
        labels.y_label,
    )?;

    writer
        .write_event(Event::End(BytesEnd::new("svg")))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: ChartLabels<'static> = ChartLabels {
        title: "Test",
        x_label: "Strain",
        y_label: "Stress",
    };

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0");
        assert_eq!(format_tick(250.0), "250");
        assert_eq!(format_tick(12.5), "12.5");
        assert_eq!(format_tick(0.002), "2.00e-3");
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(line_chart_svg(&[0.0, 1.0], &[0.0], &LABELS).is_err());
        assert!(line_chart_svg(&[], &[], &LABELS).is_err());
    }

    #[test]
    fn test_constant_series_still_renders() {
        let svg = line_chart_svg(&[0.0, 1.0], &[5.0, 5.0], &LABELS).unwrap();
        assert!(svg.contains("<polyline"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let labels = ChartLabels {
            title: "a < b & c",
            ..LABELS
        };
        let svg = line_chart_svg(&[0.0, 1.0], &[0.0, 1.0], &labels).unwrap();
        assert!(svg.contains("a &lt; b &amp; c"));
    }
}
