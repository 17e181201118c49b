//! SVG charts of delay and weather data.
//!
//! Every chart renders to an in-memory SVG string so the same output can be
//! saved under the chart directory or inlined by the dashboard. Inputs are
//! validated like the analysis functions: a missing or mistyped column is an
//! error and nothing is drawn.

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::{self, CorrelationMatrix, numeric_values};
use crate::error::DataError;
use crate::output::ensure_parent;
use crate::table::Table;

const SIZE: (u32, u32) = (800, 500);
const FONT: &str = "sans-serif";
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Histogram of `column` with a kernel density curve scaled to counts.
pub fn delay_distribution(table: &Table, column: &str, title: &str) -> Result<String> {
    let values = numeric_values(table, column)?;
    if values.is_empty() {
        bail!(DataError::InsufficientData(format!("column '{column}' has no values")));
    }

    let bins = histogram_bins(&values);
    let (lo, hi) = (bins[0].0, bins[bins.len() - 1].1);
    let width = bins[0].1 - bins[0].0;
    let grid: Vec<f64> = (0..=200).map(|i| lo + (hi - lo) * i as f64 / 200.0).collect();
    let scale = values.len() as f64 * width;
    let kde: Vec<(f64, f64)> = grid
        .iter()
        .copied()
        .zip(analyzers::utility::gaussian_kde(&values, &grid))
        .map(|(x, d)| (x, d * scale))
        .collect();
    let y_max = bins
        .iter()
        .map(|b| b.2)
        .chain(kde.iter().map(|p| p.1))
        .fold(1.0_f64, f64::max)
        * 1.1;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(lo..hi, 0f64..y_max)?;
        chart
            .configure_mesh()
            .x_desc(column)
            .y_desc("Count")
            .draw()?;
        chart.draw_series(bins.iter().map(|(x0, x1, count)| {
            Rectangle::new([(*x0, 0.0), (*x1, *count)], BLUE.mix(0.5).filled())
        }))?;
        if !kde.is_empty() {
            chart
                .draw_series(LineSeries::new(kde, RED.stroke_width(2)))?
                .label("density")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        root.present()?;
    }
    debug!(column, bins = bins.len(), "Delay distribution rendered");
    Ok(svg)
}

/// Line chart of `value_column` over `time_column`. Rows with a null time or
/// value are left out.
pub fn time_series(table: &Table, time_column: &str, value_column: &str, title: &str) -> Result<String> {
    let times = table.timestamps(time_column)?;
    let values = table.floats(value_column)?;
    let mut points: Vec<(f64, f64)> = times
        .into_iter()
        .zip(values)
        .filter_map(|(t, v)| Some((day_number(t?), v?)))
        .collect();
    if points.is_empty() {
        bail!(DataError::InsufficientData(format!(
            "no complete '{time_column}'/'{value_column}' pairs"
        )));
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (x_lo, x_hi) = padded(points.iter().map(|p| p.0), 0.5);
    let (y_lo, y_hi) = padded(points.iter().map(|p| p.1), 1.0);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi, y_lo.min(0.0)..y_hi)?;
        chart
            .configure_mesh()
            .x_desc(time_column)
            .y_desc(value_column)
            .x_labels(6)
            .x_label_formatter(&|x| format_day(*x))
            .draw()?;
        chart.draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))?;
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, BLUE.filled())))?;
        root.present()?;
    }
    Ok(svg)
}

/// Heatmap of a correlation matrix with the coefficient printed in each cell.
pub fn correlation_heatmap(matrix: &CorrelationMatrix, title: &str) -> Result<String> {
    let n = matrix.columns().len();
    if n == 0 {
        bail!(DataError::InvalidArgument("correlation matrix is empty".to_string()));
    }
    let size = n as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (SIZE.0, SIZE.0)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(20)
            .build_cartesian_2d(-1.6f64..size, 0f64..size + 0.6)?;

        let centered = TextStyle::from((FONT, 15).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        for i in 0..n {
            for j in 0..n {
                let r = matrix.get(i, j);
                let top = size - i as f64;
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(j as f64, top - 1.0), (j as f64 + 1.0, top)],
                    diverging_color(r).filled(),
                )))?;
                let label = if r.is_nan() { "n/a".to_string() } else { format!("{r:.2}") };
                chart.draw_series(std::iter::once(Text::new(
                    label,
                    (j as f64 + 0.5, top - 0.5),
                    centered.clone(),
                )))?;
            }
        }
        for (k, name) in matrix.columns().iter().enumerate() {
            chart.draw_series(std::iter::once(Text::new(
                name.clone(),
                (-0.8, size - k as f64 - 0.5),
                centered.clone(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                name.clone(),
                (k as f64 + 0.5, size + 0.3),
                centered.clone(),
            )))?;
        }
        root.present()?;
    }
    Ok(svg)
}

/// Bar chart of the mean of `value_column` per `category_column` value.
pub fn category_vs_delay(
    table: &Table,
    category_column: &str,
    value_column: &str,
    title: &str,
) -> Result<String> {
    let groups = analyzers::group_mean(table, category_column, value_column)?;
    if groups.is_empty() {
        bail!(DataError::InsufficientData(format!(
            "no '{value_column}' values per '{category_column}'"
        )));
    }
    let labels: Vec<String> = groups.groups().iter().map(|(k, _)| k.label()).collect();
    let means: Vec<f64> = groups.groups().iter().map(|(_, m)| *m).collect();
    let y_hi = means.iter().copied().fold(1.0_f64, f64::max) * 1.15;
    let y_lo = means.iter().copied().fold(0.0_f64, f64::min);
    let k = labels.len() as u32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 22))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..k).into_segmented(), y_lo..y_hi)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(category_column)
            .y_desc(format!("mean {value_column}"))
            .x_labels(labels.len())
            .x_label_formatter(&|v: &SegmentValue<u32>| segment_label(v, &labels))
            .draw()?;
        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.6).filled())
                .margin(12)
                .data(means.iter().enumerate().map(|(i, m)| (i as u32, *m))),
        )?;
        root.present()?;
    }
    Ok(svg)
}

/// Writes a rendered chart to `dir/<name>.svg`.
pub fn save_chart(svg: &str, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{name}.svg"));
    ensure_parent(&path)?;
    std::fs::write(&path, svg)?;
    info!(path = %path.display(), "Chart saved");
    Ok(path)
}

/// Equal-width bins `(start, end, count)` using Sturges' rule.
fn histogram_bins(values: &[f64]) -> Vec<(f64, f64, f64)> {
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| (a.min(*v), b.max(*v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let k = ((values.len() as f64).log2().ceil() as usize + 1).max(1);
    let width = (hi - lo) / k as f64;
    let mut bins: Vec<(f64, f64, f64)> = (0..k)
        .map(|i| (lo + i as f64 * width, lo + (i + 1) as f64 * width, 0.0))
        .collect();
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(k - 1);
        bins[idx].2 += 1.0;
    }
    bins
}

fn day_number(ts: NaiveDateTime) -> f64 {
    ts.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}

fn format_day(x: f64) -> String {
    DateTime::from_timestamp((x * SECONDS_PER_DAY).round() as i64, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn padded(values: impl Iterator<Item = f64>, min_pad: f64) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), v| (a.min(v), b.max(v)));
    let pad = ((hi - lo) * 0.05).max(min_pad);
    (lo - pad, hi + pad)
}

fn segment_label(v: &SegmentValue<u32>, labels: &[String]) -> String {
    match v {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Blue for -1, white for 0, red for +1; grey when undefined.
fn diverging_color(r: f64) -> RGBColor {
    if r.is_nan() {
        return RGBColor(200, 200, 200);
    }
    let r = r.clamp(-1.0, 1.0);
    let (target, t) = if r < 0.0 { ((59, 76, 192), -r) } else { ((180, 4, 38), r) };
    let mix = |c: u8| (255.0 + (c as f64 - 255.0) * t).round() as u8;
    RGBColor(mix(target.0), mix(target.1), mix(target.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{CorrelationMethod, correlation_matrix};
    use crate::table::{DataType, coerce};
    use serde_json::json;

    fn merged() -> Table {
        let mut t = Table::from_json_rows(&[
            json!({"scheduled_time": "2023-01-15 08:00:00", "delay_minutes": 5.0, "temperature": 2.5, "humidity": 85.0, "weather_condition": "cloudy"}),
            json!({"scheduled_time": "2023-01-15 10:30:00", "delay_minutes": 0.0, "temperature": 3.0, "humidity": 80.0, "weather_condition": "sunny"}),
            json!({"scheduled_time": "2023-01-16 08:00:00", "delay_minutes": 10.0, "temperature": -1.0, "humidity": 90.0, "weather_condition": "snowy"}),
            json!({"scheduled_time": "2023-01-16 10:30:00", "delay_minutes": 5.0, "temperature": 0.0, "humidity": 92.0, "weather_condition": "snowy"}),
        ])
        .unwrap();
        t.map_column("scheduled_time", DataType::Timestamp, coerce::to_timestamp)
            .unwrap();
        t
    }

    #[test]
    fn test_histogram_bins_cover_all_values() {
        let bins = histogram_bins(&[5.0, 0.0, 10.0, 5.0, 0.0, 15.0]);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.2).sum::<f64>(), 6.0);
        assert_eq!(bins[0].0, 0.0);
        assert_eq!(bins[3].1, 15.0);

        let single = histogram_bins(&[3.0]);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].2, 1.0);
    }

    #[test]
    fn test_diverging_color_ends() {
        assert_eq!(diverging_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(diverging_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging_color(f64::NAN), RGBColor(200, 200, 200));
    }

    #[test]
    fn test_charts_render_svg() {
        let t = merged();
        let svg = delay_distribution(&t, "delay_minutes", "Delay distribution").unwrap();
        assert!(svg.contains("<svg"));

        let svg = time_series(&t, "scheduled_time", "delay_minutes", "Delays over time").unwrap();
        assert!(svg.contains("<polyline") || svg.contains("<path"));

        let m = correlation_matrix(&t, &["delay_minutes", "temperature", "humidity"], CorrelationMethod::Pearson)
            .unwrap();
        let svg = correlation_heatmap(&m, "Correlation").unwrap();
        assert!(svg.contains("humidity"));

        let svg = category_vs_delay(&t, "weather_condition", "delay_minutes", "By condition").unwrap();
        assert!(svg.contains("snowy"));
    }

    #[test]
    fn test_charts_reject_bad_columns() {
        let t = merged();
        assert!(delay_distribution(&t, "missing", "x").is_err());
        assert!(time_series(&t, "delay_minutes", "delay_minutes", "x").is_err());
        assert!(category_vs_delay(&t, "weather_condition", "weather_condition", "x").is_err());
    }

    #[test]
    fn test_save_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_chart("<svg></svg>", &dir.path().join("charts"), "empty").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<svg></svg>");
    }
}
