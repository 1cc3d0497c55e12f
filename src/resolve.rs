use tracing::{debug, warn};

use crate::data::Dataset;
use crate::error::{ResolveError, ResolveResult};
use crate::ir::{
    AxisTitles, BarSpec, ChartBody, ChartSize, ChartSpec, LineSpec, PieSpec, Resolution,
    ResolveWarning, ScatterSpec,
};
use crate::options::{BarOptions, ChartKind, ChartOptions, LineOptions, PieOptions, ScatterOptions, SortMode};
use crate::palette::Palette;
use crate::scale::{derive_y_range, numeric_values};
use crate::transform::{sort_chronological, sort_descending};

/// Resolve a chart request against a dataset.
///
/// The caller is expected to skip resolution for an empty dataset.
/// Neither argument is modified; sorted or coerced rows live in the
/// returned spec's own copy of the data.
pub fn resolve(data: &Dataset, options: &ChartOptions) -> ResolveResult<Resolution> {
    // 1. Every referenced column must exist
    check_column_refs(data, options)?;

    // 2. Per-kind resolution
    let resolution = match options {
        ChartOptions::Bar(bar) => resolve_bar(data, bar)?,
        ChartOptions::Pie(pie) => no_warnings(resolve_pie(data, pie)?),
        ChartOptions::Line(line) => no_warnings(resolve_line(data, line)?),
        ChartOptions::Scatter(scatter) => no_warnings(resolve_scatter(data, scatter)?),
    };

    debug!(
        kind = %options.kind(),
        rows = resolution.spec.data.n_rows(),
        degraded = resolution.is_degraded(),
        "resolved chart request"
    );
    Ok(resolution)
}

fn check_column_refs(data: &Dataset, options: &ChartOptions) -> ResolveResult<()> {
    for (role, column) in options.column_refs() {
        if data.column(column).is_none() {
            return Err(ResolveError::InvalidColumnReference {
                column: column.to_string(),
                role,
            });
        }
    }
    Ok(())
}

fn no_warnings(spec: ChartSpec) -> Resolution {
    Resolution {
        spec,
        warnings: Vec::new(),
    }
}

fn resolve_bar(data: &Dataset, opts: &BarOptions) -> ResolveResult<Resolution> {
    // Range comes from the input rows so a date-coerced X can never leak into it
    let y_range = derive_y_range(data, &opts.y)?;

    let mut warnings = Vec::new();
    let sorted = match opts.sort {
        SortMode::Unsorted => data.clone(),
        SortMode::DescendingByY => sort_descending(data, &opts.y),
        SortMode::ChronologicalByX => match sort_chronological(data, &opts.x) {
            Ok(sorted) => sorted,
            Err(bad_value) => {
                let warning = ResolveWarning::ChronologicalSortUnavailable {
                    column: opts.x.clone(),
                    value: bad_value.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                data.clone()
            }
        },
    };

    let size = ChartSize::clamped(opts.width, opts.height);
    if size.width != opts.width || size.height != opts.height {
        warn!(
            requested_width = opts.width,
            requested_height = opts.height,
            width = size.width,
            height = size.height,
            "chart size clamped to supported range"
        );
    }

    let spec = ChartSpec {
        title: chart_title(ChartKind::Bar, &opts.title),
        data: sorted,
        body: ChartBody::Bar(BarSpec {
            x: opts.x.clone(),
            y: opts.y.clone(),
            color: opts.color.clone(),
            palette: Palette::resolve(opts.palette),
            y_range,
            axis_titles: axis_titles(&opts.x, &opts.y, &opts.x_title, &opts.y_title),
            show_values: true,
            italic_x_ticks: opts.italic_x_ticks,
            size,
        }),
    };

    Ok(Resolution { spec, warnings })
}

fn resolve_pie(data: &Dataset, opts: &PieOptions) -> ResolveResult<ChartSpec> {
    numeric_values(data, &opts.values, "pie values")?;

    Ok(ChartSpec {
        title: chart_title(ChartKind::Pie, &opts.title),
        data: data.clone(),
        body: ChartBody::Pie(PieSpec {
            names: opts.names.clone(),
            values: opts.values.clone(),
        }),
    })
}

fn resolve_line(data: &Dataset, opts: &LineOptions) -> ResolveResult<ChartSpec> {
    let y_range = derive_y_range(data, &opts.y)?;

    Ok(ChartSpec {
        title: chart_title(ChartKind::Line, &opts.title),
        data: data.clone(),
        body: ChartBody::Line(LineSpec {
            x: opts.x.clone(),
            y: opts.y.clone(),
            y_range,
            axis_titles: axis_titles(&opts.x, &opts.y, &opts.x_title, &opts.y_title),
        }),
    })
}

fn resolve_scatter(data: &Dataset, opts: &ScatterOptions) -> ResolveResult<ChartSpec> {
    let y_range = derive_y_range(data, &opts.y)?;

    Ok(ChartSpec {
        title: chart_title(ChartKind::Scatter, &opts.title),
        data: data.clone(),
        body: ChartBody::Scatter(ScatterSpec {
            x: opts.x.clone(),
            y: opts.y.clone(),
            color: opts.color.clone(),
            y_range,
            axis_titles: axis_titles(&opts.x, &opts.y, &opts.x_title, &opts.y_title),
        }),
    })
}

fn chart_title(kind: ChartKind, title: &Option<String>) -> String {
    title.clone().unwrap_or_else(|| format!("{} chart", kind))
}

/// Axis titles default to the bound column names
fn axis_titles(x: &str, y: &str, x_title: &Option<String>, y_title: &Option<String>) -> AxisTitles {
    AxisTitles {
        x: x_title.clone().unwrap_or_else(|| x.to_string()),
        y: y_title.clone().unwrap_or_else(|| y.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, Value};
    use crate::palette::PaletteName;
    use approx::assert_relative_eq;

    fn bar(x: &str, y: &str, sort: SortMode) -> ChartOptions {
        ChartOptions::Bar(BarOptions {
            sort,
            ..BarOptions::new(x, y)
        })
    }

    fn words_table() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "fruit",
                ["apple", "banana", "x"].iter().map(|s| Value::Text(s.to_string())).collect(),
            ),
            Column::new("n", vec![Value::Number(2.0), Value::Number(9.0), Value::Number(4.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_bar_unsorted_keeps_rows() {
        let data = Dataset::default_table();
        let res = resolve(&data, &bar("Categoría", "Valor_1", SortMode::Unsorted)).unwrap();
        assert_eq!(res.spec.data, data);
        assert!(!res.is_degraded());
    }

    #[test]
    fn test_bar_descending_default_table() {
        let data = Dataset::default_table();
        let res = resolve(&data, &bar("Categoría", "Valor_1", SortMode::DescendingByY)).unwrap();

        let labels: Vec<String> = res.spec.data.column("Categoría").unwrap().values
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(labels, vec!["C", "B", "A", "D"]);

        let range = res.spec.y_range().unwrap();
        assert_eq!(range.lower, 0.0);
        assert_relative_eq!(range.upper, 38.5, epsilon = 1e-9);

        // input untouched
        assert_eq!(data, Dataset::default_table());
    }

    #[test]
    fn test_bar_descending_is_non_increasing() {
        let data = Dataset::default_table();
        let res = resolve(&data, &bar("Categoría", "Valor_2", SortMode::DescendingByY)).unwrap();
        let ys: Vec<f64> = res.spec.data.column("Valor_2").unwrap().values
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert!(ys.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_bar_chronological_on_words_degrades_to_unsorted() {
        let data = words_table();
        let degraded = resolve(&data, &bar("fruit", "n", SortMode::ChronologicalByX)).unwrap();
        let unsorted = resolve(&data, &bar("fruit", "n", SortMode::Unsorted)).unwrap();

        assert!(degraded.is_degraded());
        assert_eq!(degraded.spec, unsorted.spec);
        assert_eq!(
            degraded.warnings,
            vec![ResolveWarning::ChronologicalSortUnavailable {
                column: "fruit".to_string(),
                value: "apple".to_string(),
            }]
        );
    }

    #[test]
    fn test_bar_chronological_on_numeric_column_degrades() {
        let data = Dataset::default_table();
        let res = resolve(&data, &bar("Valor_1", "Valor_2", SortMode::ChronologicalByX)).unwrap();
        assert!(res.is_degraded());
        assert_eq!(res.spec.data, data);
    }

    #[test]
    fn test_bar_chronological_on_dates_sorts() {
        let data = Dataset::new(vec![
            Column::new(
                "mes",
                ["2024-03-01", "2024-01-01", "2024-02-01"]
                    .iter()
                    .map(|s| Value::Text(s.to_string()))
                    .collect(),
            ),
            Column::new("ventas", vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)]),
        ])
        .unwrap();

        let res = resolve(&data, &bar("mes", "ventas", SortMode::ChronologicalByX)).unwrap();
        assert!(!res.is_degraded());
        let ventas: Vec<f64> = res.spec.data.column("ventas").unwrap().values
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        assert_eq!(ventas, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bar_resolves_palette_size_and_labels() {
        let opts = ChartOptions::Bar(BarOptions {
            palette: PaletteName::Pastel,
            width: 5000,
            height: 100,
            italic_x_ticks: true,
            x_title: Some("Category".to_string()),
            ..BarOptions::new("Categoría", "Valor_1")
        });
        let res = resolve(&Dataset::default_table(), &opts).unwrap();
        let ChartBody::Bar(body) = &res.spec.body else {
            panic!("expected a bar body");
        };
        assert_eq!(body.palette.name, PaletteName::Pastel);
        assert_eq!(body.size, ChartSize { width: 1200, height: 300 });
        assert!(body.show_values);
        assert!(body.italic_x_ticks);
        assert_eq!(body.axis_titles.x, "Category");
        assert_eq!(body.axis_titles.y, "Valor_1");
        assert_eq!(res.spec.title, "Bar chart");
        assert!(res.spec.color().is_none());
    }

    #[test]
    fn test_unknown_column_is_reported() {
        let err = resolve(&Dataset::default_table(), &bar("Categoría", "Missing", SortMode::Unsorted))
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::InvalidColumnReference {
                column: "Missing".to_string(),
                role: "y axis",
            }
        );
    }

    #[test]
    fn test_unknown_color_column_is_reported() {
        let opts = ChartOptions::Scatter(ScatterOptions {
            x: "Valor_1".to_string(),
            y: "Valor_2".to_string(),
            color: Some("Region".to_string()),
            title: None,
            x_title: None,
            y_title: None,
        });
        let err = resolve(&Dataset::default_table(), &opts).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidColumnReference { role: "color grouping", .. }));
    }

    #[test]
    fn test_text_y_column_rejected() {
        let err = resolve(&Dataset::default_table(), &bar("Valor_1", "Categoría", SortMode::Unsorted))
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidAxisData { .. }));
        assert!(err.to_string().contains("Categoría"));
    }

    #[test]
    fn test_pie_default_table() {
        let opts = ChartOptions::Pie(PieOptions {
            names: "Categoría".to_string(),
            values: "Valor_2".to_string(),
            title: Some("Shares".to_string()),
        });
        let res = resolve(&Dataset::default_table(), &opts).unwrap();
        assert_eq!(res.spec.kind(), ChartKind::Pie);
        assert_eq!(res.spec.title, "Shares");
        assert!(res.spec.y_range().is_none());
        assert_eq!(res.spec.data, Dataset::default_table());
    }

    #[test]
    fn test_pie_text_values_rejected() {
        let opts = ChartOptions::Pie(PieOptions {
            names: "Valor_1".to_string(),
            values: "Categoría".to_string(),
            title: None,
        });
        let err = resolve(&Dataset::default_table(), &opts).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidAxisData { operation: "pie values", .. }));
    }

    #[test]
    fn test_line_axis_titles_default_to_columns() {
        let opts = ChartOptions::Line(LineOptions {
            x: "Categoría".to_string(),
            y: "Valor_2".to_string(),
            title: None,
            x_title: None,
            y_title: Some("Units".to_string()),
        });
        let res = resolve(&Dataset::default_table(), &opts).unwrap();
        let ChartBody::Line(body) = &res.spec.body else {
            panic!("expected a line body");
        };
        assert_eq!(body.axis_titles.x, "Categoría");
        assert_eq!(body.axis_titles.y, "Units");
        assert_relative_eq!(body.y_range.upper, 33.0, epsilon = 1e-9);
        assert_eq!(res.spec.title, "Line chart");
    }

    #[test]
    fn test_scatter_color_grouping() {
        let opts = ChartOptions::Scatter(ScatterOptions {
            x: "Valor_1".to_string(),
            y: "Valor_2".to_string(),
            color: Some("Categoría".to_string()),
            title: None,
            x_title: None,
            y_title: None,
        });
        let res = resolve(&Dataset::default_table(), &opts).unwrap();
        assert_eq!(res.spec.color(), Some("Categoría"));
        assert_relative_eq!(res.spec.y_range().unwrap().upper, 33.0, epsilon = 1e-9);
    }
}
