use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;
use std::collections::HashMap;

use crate::data::{Column, Dataset, Value};
use crate::ir::{BarSpec, ChartBody, ChartSpec, LineSpec, PieSpec, ScatterSpec};
use crate::palette::Palette;
use crate::scale::{drawable_range, pad_range};
use crate::transform::coerce_datetime;
use crate::{OutputFormat, RenderOptions};

/// Largest accepted canvas side, in pixels
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Render a resolved chart to PNG or SVG bytes.
///
/// Bar charts carry their own pixel size; other kinds use `options`.
pub fn render_chart(spec: &ChartSpec, options: &RenderOptions) -> Result<Vec<u8>> {
    let (width, height) = match &spec.body {
        ChartBody::Bar(bar) => (bar.size.width, bar.size.height),
        _ => (options.width, options.height),
    };
    check_canvas(width, height)?;

    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; width as usize * height as usize * 3];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw_chart(&root, spec)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, width, height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw_chart(&root, spec)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
    }
}

fn check_canvas(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        bail!("Chart size {}x{} is empty: width and height must be positive", width, height);
    }
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        bail!(
            "Chart size {}x{} is too large: width and height are limited to {} pixels",
            width,
            height,
            MAX_CANVAS_SIDE
        );
    }
    Ok(())
}

fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    match &spec.body {
        ChartBody::Bar(bar) => draw_bar(root, spec, bar),
        ChartBody::Pie(pie) => draw_pie(root, spec, pie),
        ChartBody::Line(line) => draw_line(root, spec, line),
        ChartBody::Scatter(scatter) => draw_scatter(root, spec, scatter),
    }
}

fn draw_bar<DB>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec, bar: &BarSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_col = column(&spec.data, &bar.x)?;
    let y_col = column(&spec.data, &bar.y)?;
    let categories = distinct_labels(&x_col.values);
    let category_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let groups = color_groups(&spec.data, bar.color.as_deref())?;
    let (y_min, y_max) = drawable_range(bar.y_range);

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&spec.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..categories.len() as u32).into_segmented(), y_min..y_max)
        .context("Failed to build chart")?;

    let tick_font = if bar.italic_x_ticks {
        ("sans-serif", 12).into_font().style(FontStyle::Italic)
    } else {
        ("sans-serif", 12).into_font()
    };
    let label_formatter = |v: &SegmentValue<u32>| match v {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
            categories.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len())
        .x_label_formatter(&label_formatter)
        .x_label_style(tick_font)
        .x_desc(bar.axis_titles.x.as_str())
        .y_desc(bar.axis_titles.y.as_str())
        .draw()
        .context("Failed to draw mesh")?;

    // Bars sharing a category stack: positive values upward, negative downward
    let mut positive_top = vec![0.0; categories.len()];
    let mut negative_bottom = vec![0.0; categories.len()];
    let value_style = TextStyle::from(("sans-serif", 12).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));

    for (group_idx, (key, rows)) in groups.iter().enumerate() {
        let color = bar.palette.rgb_at(group_idx)?;
        let mut rects = Vec::new();
        let mut labels = Vec::new();

        for &row in rows {
            let Some(y) = y_col.values[row].as_f64() else {
                continue;
            };
            let Some(&cat) = category_index.get(x_col.values[row].to_string().as_str()) else {
                continue;
            };
            let (y0, y1) = if y >= 0.0 {
                let start = positive_top[cat];
                positive_top[cat] = start + y;
                (start, start + y)
            } else {
                let start = negative_bottom[cat];
                negative_bottom[cat] = start + y;
                (start, start + y)
            };

            let mut rect = Rectangle::new(
                [
                    (SegmentValue::Exact(cat as u32), y0),
                    (SegmentValue::Exact(cat as u32 + 1), y1),
                ],
                color.filled(),
            );
            rect.set_margin(0, 0, 8, 8);
            rects.push(rect);

            if bar.show_values {
                labels.push(Text::new(
                    format_value(y),
                    (SegmentValue::CenterOf(cat as u32), y1),
                    value_style.clone(),
                ));
            }
        }

        let series = chart.draw_series(rects).context("Failed to draw bars")?;
        if bar.color.is_some() {
            series
                .label(key.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        chart.draw_series(labels).context("Failed to draw bar labels")?;
    }

    if bar.color.is_some() {
        draw_legend(&mut chart)?;
    }

    Ok(())
}

fn draw_pie<DB>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec, pie: &PieSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let slices = pie_slices(&spec.data, pie)?;
    if slices.is_empty() {
        bail!("Cannot draw a pie chart: column '{}' has no positive values", pie.values);
    }

    let area = root
        .titled(&spec.title, ("sans-serif", 20))
        .context("Failed to draw title")?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.38;

    let palette = Palette::default();
    let colors = (0..slices.len())
        .map(|i| palette.rgb_at(i))
        .collect::<Result<Vec<_>>>()?;
    let labels: Vec<&str> = slices.iter().map(|(label, _)| label.as_str()).collect();
    let sizes: Vec<f64> = slices.iter().map(|(_, size)| *size).collect();

    let mut slices_drawing = Pie::new(&center, &radius, &sizes, &colors, &labels);
    slices_drawing.start_angle(-90.0);
    slices_drawing.label_style(("sans-serif", 14).into_font().color(&BLACK));
    slices_drawing.percentages(("sans-serif", 12).into_font().color(&WHITE));
    area.draw(&slices_drawing).context("Failed to draw pie")?;

    Ok(())
}

/// Pie slices: values summed per name, in order of first appearance.
/// Null and non-positive totals are dropped.
pub fn pie_slices(data: &Dataset, pie: &PieSpec) -> Result<Vec<(String, f64)>> {
    let names = column(data, &pie.names)?;
    let values = column(data, &pie.values)?;

    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    for (name, value) in names.values.iter().zip(&values.values) {
        let Some(v) = value.as_f64() else {
            continue;
        };
        let key = name.to_string();
        if !totals.contains_key(&key) {
            order.push(key.clone());
        }
        *totals.entry(key).or_insert(0.0) += v;
    }

    Ok(order
        .into_iter()
        .filter_map(|key| {
            let total = totals.get(&key).copied().unwrap_or(0.0);
            (total > 0.0).then_some((key, total))
        })
        .collect())
}

fn draw_line<DB>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec, line: &LineSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_axis = XAxis::from_values(&column(&spec.data, &line.x)?.values);
    let y_col = column(&spec.data, &line.y)?;
    let (x_min, x_max) = x_axis.range();
    let (y_min, y_max) = drawable_range(line.y_range);

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&spec.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .context("Failed to build chart")?;

    let formatter = |v: &f64| x_axis.label(*v);
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(line.axis_titles.x.as_str())
        .y_desc(line.axis_titles.y.as_str());
    if !x_axis.is_numeric() {
        mesh.x_label_formatter(&formatter);
    }
    mesh.draw().context("Failed to draw mesh")?;

    let points: Vec<(f64, f64)> = x_axis
        .positions
        .iter()
        .zip(&y_col.values)
        .filter_map(|(x, y)| Some(((*x)?, y.as_f64()?)))
        .collect();

    let color = Palette::default().rgb_at(0)?;
    chart
        .draw_series(LineSeries::new(points, color.stroke_width(2)))
        .context("Failed to draw line series")?;

    Ok(())
}

fn draw_scatter<DB>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec, scatter: &ScatterSpec) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_axis = XAxis::from_values(&column(&spec.data, &scatter.x)?.values);
    let y_col = column(&spec.data, &scatter.y)?;
    let groups = color_groups(&spec.data, scatter.color.as_deref())?;
    let (x_min, x_max) = x_axis.range();
    let (y_min, y_max) = drawable_range(scatter.y_range);

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(&spec.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .context("Failed to build chart")?;

    let formatter = |v: &f64| x_axis.label(*v);
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(scatter.axis_titles.x.as_str())
        .y_desc(scatter.axis_titles.y.as_str());
    if !x_axis.is_numeric() {
        mesh.x_label_formatter(&formatter);
    }
    mesh.draw().context("Failed to draw mesh")?;

    let palette = Palette::default();
    for (group_idx, (key, rows)) in groups.iter().enumerate() {
        let color = palette.rgb_at(group_idx)?;
        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|&row| Some((x_axis.positions[row]?, y_col.values[row].as_f64()?)))
            .collect();

        let series = chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))
            .context("Failed to draw point series")?;
        if scatter.color.is_some() {
            series
                .label(key.as_str())
                .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
        }
    }

    if scatter.color.is_some() {
        draw_legend(&mut chart)?;
    }

    Ok(())
}

fn draw_legend<'a, DB, CT>(chart: &mut ChartContext<'a, DB, CT>) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    CT: CoordTranslate,
{
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")?;
    Ok(())
}

/// How X values map onto a continuous axis
enum XKind {
    Numeric,
    Temporal,
    Categorical(Vec<String>),
}

struct XAxis {
    positions: Vec<Option<f64>>,
    kind: XKind,
}

impl XAxis {
    fn from_values(values: &[Value]) -> Self {
        let present = || values.iter().filter(|v| !v.is_null());

        if present().all(|v| matches!(v, Value::Number(_))) {
            return Self {
                positions: values.iter().map(Value::as_f64).collect(),
                kind: XKind::Numeric,
            };
        }

        // Date-like text goes on a time axis, like already coerced date-times
        let instants: Vec<Option<NaiveDateTime>> = values.iter().map(coerce_datetime).collect();
        let all_dates = values
            .iter()
            .zip(&instants)
            .all(|(v, instant)| v.is_null() || instant.is_some());
        if all_dates {
            return Self {
                positions: instants
                    .iter()
                    .map(|dt| dt.map(|dt| dt.and_utc().timestamp() as f64))
                    .collect(),
                kind: XKind::Temporal,
            };
        }

        let categories = distinct_labels(values);
        let index: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let positions = values
            .iter()
            .map(|v| {
                if v.is_null() {
                    None
                } else {
                    index.get(v.to_string().as_str()).map(|&i| i as f64)
                }
            })
            .collect();
        Self {
            positions,
            kind: XKind::Categorical(categories),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self.kind, XKind::Numeric)
    }

    fn range(&self) -> (f64, f64) {
        if let XKind::Categorical(categories) = &self.kind {
            return (-0.5, categories.len().max(1) as f64 - 0.5);
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in self.positions.iter().flatten() {
            min = min.min(*v);
            max = max.max(*v);
        }
        if !min.is_finite() {
            return (0.0, 1.0);
        }
        pad_range(min, max)
    }

    fn label(&self, v: f64) -> String {
        match &self.kind {
            XKind::Numeric => format_value(v),
            XKind::Temporal => DateTime::from_timestamp(v as i64, 0)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            XKind::Categorical(categories) => {
                let idx = v.round();
                if (v - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                categories.get(idx as usize).cloned().unwrap_or_default()
            }
        }
    }
}

fn column<'a>(data: &'a Dataset, name: &str) -> Result<&'a Column> {
    data.column(name)
        .ok_or_else(|| anyhow!("Column '{}' not found", name))
}

/// Distinct non-null labels in order of first appearance
fn distinct_labels(values: &[Value]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Row indices split by the color column, groups in first-appearance order.
/// Without a color column every row belongs to one group.
fn color_groups(data: &Dataset, color: Option<&str>) -> Result<Vec<(String, Vec<usize>)>> {
    let Some(name) = color else {
        return Ok(vec![(String::new(), (0..data.n_rows()).collect())]);
    };

    let col = column(data, name)?;
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (row, value) in col.values.iter().enumerate() {
        let key = value.to_string();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }
    Ok(groups)
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Encode an RGB buffer as PNG
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ChartOptions, LineOptions};
    use crate::resolve;
    use chrono::NaiveDate;

    #[test]
    fn test_pie_slices_default_table() {
        let pie = PieSpec {
            names: "Categoría".to_string(),
            values: "Valor_2".to_string(),
        };
        let slices = pie_slices(&Dataset::default_table(), &pie).unwrap();
        assert_eq!(
            slices,
            vec![
                ("A".to_string(), 25.0),
                ("B".to_string(), 15.0),
                ("C".to_string(), 10.0),
                ("D".to_string(), 30.0),
            ]
        );
    }

    #[test]
    fn test_pie_slices_sum_repeated_names() {
        let data = Dataset::new(vec![
            Column::new("k", vec![Value::Text("a".into()), Value::Text("b".into()), Value::Text("a".into())]),
            Column::new("v", vec![Value::Number(1.0), Value::Null, Value::Number(2.0)]),
        ])
        .unwrap();
        let pie = PieSpec {
            names: "k".to_string(),
            values: "v".to_string(),
        };
        assert_eq!(pie_slices(&data, &pie).unwrap(), vec![("a".to_string(), 3.0)]);
    }

    #[test]
    fn test_color_groups_first_appearance() {
        let data = Dataset::new(vec![Column::new(
            "g",
            vec![Value::Text("b".into()), Value::Text("a".into()), Value::Text("b".into())],
        )])
        .unwrap();
        let groups = color_groups(&data, Some("g")).unwrap();
        assert_eq!(
            groups,
            vec![("b".to_string(), vec![0, 2]), ("a".to_string(), vec![1])]
        );

        let single = color_groups(&data, None).unwrap();
        assert_eq!(single, vec![(String::new(), vec![0, 1, 2])]);
    }

    #[test]
    fn test_x_axis_kinds() {
        let numeric = XAxis::from_values(&[Value::Number(1.0), Value::Null, Value::Number(3.0)]);
        assert!(numeric.is_numeric());
        assert_eq!(numeric.positions, vec![Some(1.0), None, Some(3.0)]);

        let categorical = XAxis::from_values(&[Value::Text("x".into()), Value::Text("y".into())]);
        assert_eq!(categorical.positions, vec![Some(0.0), Some(1.0)]);
        assert_eq!(categorical.range(), (-0.5, 1.5));
        assert_eq!(categorical.label(1.0), "y");
        assert_eq!(categorical.label(0.5), "");

        let dt = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let temporal = XAxis::from_values(&[Value::DateTime(dt)]);
        let pos = temporal.positions[0].unwrap();
        assert_eq!(temporal.label(pos), "2024-01-02");
    }

    #[test]
    fn test_x_axis_reads_date_text_as_time() {
        let axis = XAxis::from_values(&[
            Value::Text("2024-03-01".into()),
            Value::Text("2024-01-01".into()),
            Value::Null,
            Value::Text("2024-02-01".into()),
        ]);
        assert!(matches!(axis.kind, XKind::Temporal));
        let jan = axis.positions[1].unwrap();
        let feb = axis.positions[3].unwrap();
        let mar = axis.positions[0].unwrap();
        assert!(jan < feb && feb < mar);
        assert_eq!(axis.positions[2], None);
        assert_eq!(axis.label(jan), "2024-01-01");

        let words = XAxis::from_values(&[Value::Text("2024-01-01".into()), Value::Text("later".into())]);
        assert!(matches!(words.kind, XKind::Categorical(_)));
    }

    fn line_chart() -> ChartSpec {
        let options = ChartOptions::Line(LineOptions {
            x: "Categoría".to_string(),
            y: "Valor_1".to_string(),
            title: None,
            x_title: None,
            y_title: None,
        });
        resolve(&Dataset::default_table(), &options).unwrap().spec
    }

    #[test]
    fn test_render_rejects_oversized_canvas() {
        let options = RenderOptions {
            width: 40_000,
            height: 40_000,
            format: OutputFormat::Png,
        };
        let err = render_chart(&line_chart(), &options).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn test_render_rejects_empty_canvas() {
        for format in [OutputFormat::Png, OutputFormat::Svg] {
            let options = RenderOptions {
                width: 0,
                height: 0,
                format,
            };
            let err = render_chart(&line_chart(), &options).unwrap_err();
            assert!(err.to_string().contains("must be positive"), "{err}");
        }
    }

    #[test]
    fn test_check_canvas_bounds() {
        assert!(check_canvas(1, 1).is_ok());
        assert!(check_canvas(MAX_CANVAS_SIDE, MAX_CANVAS_SIDE).is_ok());
        assert!(check_canvas(MAX_CANVAS_SIDE + 1, 10).is_err());
        assert!(check_canvas(800, 0).is_err());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(35.0), "35");
        assert_eq!(format_value(2.5), "2.5");
        assert_eq!(format_value(1.0 / 3.0), "0.33");
    }
}
