#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use chrono::{DateTime, NaiveDateTime};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::io::Cursor;
use std::ops::Range;

use crate::error::{DashboardError, Result};
use crate::render::{ChartSpec, Fill, Series, SeriesStyle};
use crate::selection::ChartType;
use crate::stats::CorrelationMatrix;

/// Series colours, reused in order when there are more than ten series
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest accepted image side in pixels
pub const MAX_IMAGE_SIDE: u32 = 8192;

/// Size of the rendered image
///
/// A `ChartSpec` carries its own title, axis labels and height, so for the
/// main chart only the width is taken from here.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    /// 1200x600, matching the dashboard's default chart height
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
        }
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> DashboardError {
    DashboardError::Render(e.to_string())
}

/// Date/time as fractional days since the Unix epoch, the x coordinate used
/// on every chart
pub fn to_days(dt: NaiveDateTime) -> f64 {
    dt.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}

/// Axis label for an x coordinate
pub fn day_label(days: f64) -> String {
    DateTime::from_timestamp((days * SECONDS_PER_DAY).round() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Plottable (x, y) pairs of a series, sorted by x. Points missing either
/// value are skipped.
pub fn points(series: &Series) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = series
        .x
        .iter()
        .zip(&series.y)
        .filter_map(|(x, y)| Some((to_days((*x)?), (*y)?)))
        .collect();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));
    pts
}

fn padded(lo: f64, hi: f64, pad: f64) -> Range<f64> {
    if lo == hi {
        lo - 1.0..hi + 1.0
    } else {
        lo - pad..hi + pad
    }
}

/// Axis ranges covering every plotted point
///
/// Area and bar charts always include the zero baseline. Bars get half a day
/// of room on each side so the outer bars are not clipped.
pub fn axis_ranges(spec: &ChartSpec) -> (Range<f64>, Range<f64>) {
    let all: Vec<(f64, f64)> = spec.series.iter().flat_map(points).collect();
    if all.is_empty() {
        return (0.0..1.0, 0.0..1.0);
    }

    let (mut x_lo, mut x_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_lo, mut y_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in &all {
        x_lo = x_lo.min(x);
        x_hi = x_hi.max(x);
        y_lo = y_lo.min(y);
        y_hi = y_hi.max(y);
    }

    if matches!(spec.chart_type, ChartType::Area | ChartType::Bars) {
        y_lo = y_lo.min(0.0);
        y_hi = y_hi.max(0.0);
    }

    let x_pad = if spec.chart_type == ChartType::Bars {
        0.5
    } else {
        0.0
    };
    let y_pad = (y_hi - y_lo) * 0.05;
    (padded(x_lo, x_hi, x_pad), padded(y_lo, y_hi, y_pad))
}

/// Diverging red-white-blue colour for a correlation coefficient
pub fn correlation_color(value: Option<f64>) -> RGBColor {
    const RED: (f64, f64, f64) = (178.0, 24.0, 43.0);
    const MID: (f64, f64, f64) = (247.0, 247.0, 247.0);
    const BLUE: (f64, f64, f64) = (33.0, 102.0, 172.0);

    let Some(v) = value else {
        return RGBColor(200, 200, 200);
    };
    let v = v.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (MID, RED, -v)
    } else {
        (MID, BLUE, v)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Zeroed RGB buffer for an image of the given size
///
/// Zero-sized images and sides above [`MAX_IMAGE_SIDE`] are rejected.
pub fn pixel_buffer(options: &GraphOptions) -> Result<Vec<u8>> {
    let (w, h) = (options.width, options.height);
    if w == 0 || h == 0 || w > MAX_IMAGE_SIDE || h > MAX_IMAGE_SIDE {
        return Err(DashboardError::Render(format!(
            "image size {}x{} must be between 1 and {} pixels per side",
            w, h, MAX_IMAGE_SIDE
        )));
    }
    let len = (w as usize)
        .checked_mul(h as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| DashboardError::Render(format!("image size {}x{} is too large", w, h)))?;
    Ok(vec![0u8; len])
}

fn encode_png(buffer: Vec<u8>, options: &GraphOptions) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(options.width, options.height, buffer)
        .ok_or_else(|| DashboardError::Render("pixel buffer has the wrong size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(render_err)?;
    Ok(png.into_inner())
}

/// Renders the main dashboard chart to PNG
///
/// Every series of the chart is drawn against the shared time axis in the
/// style it asks for: plain lines, lines with markers, filled areas
/// stacked onto the previous series, or grouped semi-transparent bars.
///
/// # Arguments
/// * `spec` - Chart built by the render pipeline, its `height` sets the
///   image height
/// * `options` - Image width
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
///
/// # Examples
/// ```no_run
/// use tsdash::graph::{GraphOptions, render_chart_png};
/// use tsdash::render::render;
/// use tsdash::selection::Selection;
///
/// let outcome = tsdash::cache::shared().get();
/// let dashboard = render(outcome, &Selection::default());
/// if let Some(chart) = &dashboard.chart {
///     let png = render_chart_png(chart, &GraphOptions::default()).unwrap();
///     println!("chart is {} bytes", png.len());
/// }
/// ```
pub fn render_chart_png(spec: &ChartSpec, options: &GraphOptions) -> Result<Vec<u8>> {
    let options = &GraphOptions {
        width: options.width,
        height: spec.height,
    };
    let mut buffer = pixel_buffer(options)?;
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let (x_range, y_range) = axis_ranges(spec);
        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, ("sans-serif", 30).into_font())
            .margin(50)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .light_line_style(RGBColor(211, 211, 211))
            .x_desc(&spec.x_title)
            .y_desc(&spec.y_title)
            .x_label_formatter(&|x| day_label(*x))
            .draw()
            .map_err(render_err)?;

        let bar_count = spec.series.len().max(1) as f64;
        let mut previous: Vec<(f64, f64)> = Vec::new();

        for (i, series) in spec.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let data = points(series);

            match series.style {
                SeriesStyle::Line {
                    width,
                    marker_size,
                    fill,
                } => {
                    draw_fill(&mut chart, fill, &data, &previous, color)?;
                    chart
                        .draw_series(LineSeries::new(
                            data.iter().copied(),
                            color.stroke_width(width),
                        ))
                        .map_err(render_err)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                        });
                    if let Some(size) = marker_size {
                        chart
                            .draw_series(
                                data.iter()
                                    .map(|&p| Circle::new(p, size as i32, color.filled())),
                            )
                            .map_err(render_err)?;
                    }
                }
                SeriesStyle::Bar { opacity } => {
                    // Bars of one day are split evenly between the series
                    let width = 0.8 / bar_count;
                    let offset = -0.4 + width * i as f64;
                    chart
                        .draw_series(data.iter().map(|&(x, y)| {
                            Rectangle::new(
                                [(x + offset, 0.0), (x + offset + width, y)],
                                color.mix(opacity).filled(),
                            )
                        }))
                        .map_err(render_err)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| {
                            Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.mix(opacity).filled())
                        });
                }
            }

            previous = data;
        }

        if spec.show_legend && !spec.series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
    }

    encode_png(buffer, options)
}

/// Fills below a line, either to zero or down to the previous series
fn draw_fill<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    fill: Fill,
    data: &[(f64, f64)],
    previous: &[(f64, f64)],
    color: RGBColor,
) -> Result<()> {
    match fill {
        Fill::None => Ok(()),
        Fill::ToZero => chart
            .draw_series(AreaSeries::new(data.iter().copied(), 0.0, color.mix(0.3)))
            .map(|_| ())
            .map_err(render_err),
        Fill::ToPrevious => {
            let mut polygon: Vec<(f64, f64)> = data.to_vec();
            if previous.is_empty() {
                // Nothing to stack on, close the shape on the baseline
                polygon.extend(data.iter().rev().map(|&(x, _)| (x, 0.0)));
            } else {
                polygon.extend(previous.iter().rev().copied());
            }
            chart
                .draw_series(std::iter::once(Polygon::new(polygon, color.mix(0.3))))
                .map(|_| ())
                .map_err(render_err)
        }
    }
}

/// Renders a correlation matrix as a heat map with the coefficient printed
/// in every cell
///
/// # Arguments
/// * `matrix` - Pairwise correlations of the selected columns
/// * `options` - Image size
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn render_correlation_png(
    matrix: &CorrelationMatrix,
    options: &GraphOptions,
) -> Result<Vec<u8>> {
    if matrix.columns.is_empty() {
        return Err(DashboardError::Render(
            "correlation needs at least one column".to_string(),
        ));
    }
    let n = matrix.columns.len() as i32;
    let names = &matrix.columns;
    let mut buffer = pixel_buffer(options)?;
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                "Correlation between the selected variables",
                ("sans-serif", 24).into_font(),
            )
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(120)
            .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())
            .map_err(render_err)?;

        // Rows are drawn bottom-up, so the first column ends up on top
        let label = |v: &SegmentValue<i32>, flip: bool| match v {
            SegmentValue::CenterOf(i) => {
                let idx = if flip { n - 1 - *i } else { *i };
                names.get(idx as usize).cloned().unwrap_or_default()
            }
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n as usize)
            .y_labels(n as usize)
            .x_label_formatter(&|v| label(v, false))
            .y_label_formatter(&|v| label(v, true))
            .draw()
            .map_err(render_err)?;

        let cells: Vec<(i32, i32, Option<f64>)> = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| (i, j, matrix.values[i as usize][j as usize]))
            .collect();

        chart
            .draw_series(cells.iter().map(|&(i, j, v)| {
                let row = n - 1 - i;
                Rectangle::new(
                    [
                        (SegmentValue::Exact(j), SegmentValue::Exact(row)),
                        (SegmentValue::Exact(j + 1), SegmentValue::Exact(row + 1)),
                    ],
                    correlation_color(v).filled(),
                )
            }))
            .map_err(render_err)?;

        chart
            .draw_series(cells.iter().map(|&(i, j, v)| {
                let text = v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".to_string());
                Text::new(
                    text,
                    (SegmentValue::CenterOf(j), SegmentValue::CenterOf(n - 1 - i)),
                    ("sans-serif", 16).into_font(),
                )
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    encode_png(buffer, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0)
    }

    fn spec(chart_type: ChartType, ys: Vec<Option<f64>>) -> ChartSpec {
        ChartSpec {
            title: "t".into(),
            chart_type,
            x_title: "x".into(),
            y_title: "y".into(),
            show_legend: true,
            hover_mode: "x unified".into(),
            height: 600,
            series: vec![Series {
                name: "s".into(),
                x: (1..=ys.len() as u32).map(at).collect(),
                y: ys,
                style: SeriesStyle::Line {
                    width: 2,
                    marker_size: None,
                    fill: Fill::None,
                },
            }],
        }
    }

    #[test]
    fn day_coordinates_round_trip_to_labels() {
        let x = to_days(at(3).unwrap());
        assert_eq!(day_label(x), "2024-01-03");
        assert_eq!(to_days(at(4).unwrap()) - x, 1.0);
    }

    #[test]
    fn points_skip_gaps_and_sort() {
        let mut s = spec(ChartType::Lines, vec![Some(1.0), None, Some(3.0)]).series.remove(0);
        s.x.reverse();
        let pts = points(&s);
        assert_eq!(pts.len(), 2);
        assert!(pts[0].0 < pts[1].0);
        assert_eq!(pts[0].1, 3.0);
    }

    #[test]
    fn ranges_include_baseline_for_bars() {
        let lines = spec(ChartType::Lines, vec![Some(10.0), Some(20.0)]);
        let (_, y) = axis_ranges(&lines);
        assert!(y.start > 0.0);

        let bars = spec(ChartType::Bars, vec![Some(10.0), Some(20.0)]);
        let (x, y) = axis_ranges(&bars);
        assert!(y.start <= 0.0);
        assert_eq!(x.end - x.start, 2.0);

        let flat = spec(ChartType::Lines, vec![Some(5.0)]);
        let (x, y) = axis_ranges(&flat);
        assert_eq!(y, 4.0..6.0);
        assert_eq!(x.end - x.start, 2.0);

        let empty = spec(ChartType::Lines, vec![None]);
        assert_eq!(axis_ranges(&empty), (0.0..1.0, 0.0..1.0));
    }

    #[test]
    fn pixel_buffer_checks_size() {
        let buffer = pixel_buffer(&GraphOptions {
            width: 4,
            height: 2,
        })
        .unwrap();
        assert_eq!(buffer.len(), 24);
        assert_eq!(pixel_buffer(&GraphOptions::default()).unwrap().len(), 1200 * 600 * 3);

        for (width, height) in [(0, 600), (1200, 0), (u32::MAX, u32::MAX), (70_000, 70_000)] {
            assert!(matches!(
                pixel_buffer(&GraphOptions { width, height }),
                Err(DashboardError::Render(_))
            ));
        }
    }

    #[test]
    fn chart_height_comes_from_the_chart() {
        let mut flat = spec(ChartType::Lines, vec![Some(1.0)]);
        flat.height = 0;
        // Rejected before anything is drawn
        assert!(matches!(
            render_chart_png(&flat, &GraphOptions::default()),
            Err(DashboardError::Render(msg)) if msg.contains("1200x0")
        ));
    }

    #[test]
    fn correlation_colors_diverge() {
        assert_eq!(correlation_color(Some(0.0)), RGBColor(247, 247, 247));
        assert_eq!(correlation_color(Some(1.0)), RGBColor(33, 102, 172));
        assert_eq!(correlation_color(Some(-1.0)), RGBColor(178, 24, 43));
        assert_eq!(correlation_color(None), RGBColor(200, 200, 200));
    }
}
