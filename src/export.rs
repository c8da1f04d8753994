// 🖼️ Export Step - Chart series → SVG
// Same drawing is used for the on-page chart and the plot.svg download

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use crate::engine::ChartSeries;

/// File name offered for the download
pub const EXPORT_FILE_NAME: &str = "plot.svg";
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

const CHART_WIDTH: u32 = 1000;
const CHART_HEIGHT: u32 = 700;
const SERIES_COLOR: RGBColor = RGBColor(0x0A, 0x3F, 0x63);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export: no chart has been rendered yet")]
    NothingToExport,

    #[error("failed to draw chart: {0}")]
    Drawing(String),
}

/// Serialize the last successfully rendered chart, if there is one
pub fn export_chart(chart: Option<&ChartSeries>) -> Result<Vec<u8>, ExportError> {
    let series = chart.ok_or(ExportError::NothingToExport)?;
    render_svg(series).map(String::into_bytes)
}

pub fn render_svg(series: &ChartSeries) -> Result<String, ExportError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        draw_chart(&root, series).map_err(|e| ExportError::Drawing(e.to_string()))?;
    }
    Ok(svg)
}

fn draw_chart(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    series: &ChartSeries,
) -> Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;

    let categories = series.categories();
    let count = categories.len();
    let (y_min, y_max) = value_bounds(series);

    // Categories sit on integer positions; half a slot of padding on each side
    let x_range = -0.5..(count as f64 - 0.5).max(0.5);

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(90)
        .y_label_area_size(110)
        .build_cartesian_2d(x_range, y_min..y_max)?;

    let category_label = |x: &f64| -> String {
        let slot = x.round();
        if (x - slot).abs() > 1e-6 || slot < 0.0 {
            return String::new();
        }
        categories
            .get(slot as usize)
            .map(|s| s.to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(count.max(2))
        .x_label_formatter(&category_label)
        .y_label_formatter(&|v| format_tick(*v))
        .x_label_style(
            ("sans-serif", 13)
                .into_font()
                .transform(FontTransform::Rotate270)
                .color(&BLACK),
        )
        .y_label_style(("sans-serif", 13).into_font().color(&BLACK))
        .x_desc(series.x_label.as_str())
        .y_desc(series.y_label.as_str())
        .axis_desc_style(
            ("sans-serif", 18)
                .into_font()
                .style(FontStyle::Bold)
                .color(&BLACK),
        )
        .axis_style(&BLACK)
        .draw()?;

    let coords: Vec<(f64, f64)> = series
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect();

    chart.draw_series(LineSeries::new(
        coords.iter().copied(),
        SERIES_COLOR.stroke_width(2),
    ))?;
    chart.draw_series(
        coords
            .iter()
            .map(|&point| Circle::new(point, 4, SERIES_COLOR.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Y range with 10% headroom; a flat series gets a band around its value
fn value_bounds(series: &ChartSeries) -> (f64, f64) {
    let (min, max) = series
        .points
        .iter()
        .map(|p| p.value)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if min > max {
        return (0.0, 1.0);
    }

    let span = max - min;
    let pad = if span == 0.0 {
        (max.abs() * 0.1).max(1.0)
    } else {
        span * 0.1
    };

    (min - pad, max + pad)
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChartPoint;

    fn create_test_series(values: &[(&str, f64)]) -> ChartSeries {
        ChartSeries {
            points: values
                .iter()
                .map(|(fy, v)| ChartPoint {
                    financial_year: fy.to_string(),
                    value: *v,
                })
                .collect(),
            x_label: "Financial Year".to_string(),
            y_label: "Number of Factories (Quantity)".to_string(),
        }
    }

    #[test]
    fn test_export_without_chart() {
        assert!(matches!(export_chart(None), Err(ExportError::NothingToExport)));
    }

    #[test]
    fn test_export_produces_svg_document() {
        let series = create_test_series(&[("2017-18", 250000.0), ("2018-19", 260000.0)]);

        let bytes = export_chart(Some(&series)).unwrap();
        let svg = String::from_utf8(bytes).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("2017-18"));
        assert!(svg.contains("2018-19"));
        assert!(svg.contains("Number of Factories (Quantity)"));
    }

    #[test]
    fn test_export_does_not_touch_series() {
        let series = create_test_series(&[("2017-18", 250000.0)]);
        let before = series.clone();

        let first = render_svg(&series).unwrap();
        let second = render_svg(&series).unwrap();

        assert_eq!(series, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_value_bounds() {
        let series = create_test_series(&[("2017-18", 100.0), ("2018-19", 200.0)]);
        assert_eq!(value_bounds(&series), (90.0, 210.0));

        let flat = create_test_series(&[("2017-18", 50.0)]);
        assert_eq!(value_bounds(&flat), (45.0, 55.0));
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(250000.0), "250000");
        assert_eq!(format_tick(12.345), "12.35");
    }
}
