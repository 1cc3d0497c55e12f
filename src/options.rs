// User-selected chart options, one variant per chart kind

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::palette::PaletteName;

/// The chart kinds that can be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Scatter,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "Bar",
            ChartKind::Pie => "Pie",
            ChartKind::Line => "Line",
            ChartKind::Scatter => "Scatter",
        };
        f.write_str(name)
    }
}

/// Row ordering applied to a bar chart before plotting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Unsorted,
    /// Largest Y first
    DescendingByY,
    /// X interpreted as dates, oldest first
    ChronologicalByX,
}

/// Raw chart options, tagged by `kind` when read from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartOptions {
    Bar(BarOptions),
    Pie(PieOptions),
    Line(LineOptions),
    Scatter(ScatterOptions),
}

impl ChartOptions {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartOptions::Bar(_) => ChartKind::Bar,
            ChartOptions::Pie(_) => ChartKind::Pie,
            ChartOptions::Line(_) => ChartKind::Line,
            ChartOptions::Scatter(_) => ChartKind::Scatter,
        }
    }

    /// Every column this request refers to, paired with the role it plays
    pub fn column_refs(&self) -> Vec<(&'static str, &str)> {
        let mut refs = Vec::new();
        match self {
            ChartOptions::Bar(b) => {
                refs.push(("x axis", b.x.as_str()));
                refs.push(("y axis", b.y.as_str()));
                if let Some(c) = &b.color {
                    refs.push(("color grouping", c.as_str()));
                }
            }
            ChartOptions::Pie(p) => {
                refs.push(("pie names", p.names.as_str()));
                refs.push(("pie values", p.values.as_str()));
            }
            ChartOptions::Line(l) => {
                refs.push(("x axis", l.x.as_str()));
                refs.push(("y axis", l.y.as_str()));
            }
            ChartOptions::Scatter(s) => {
                refs.push(("x axis", s.x.as_str()));
                refs.push(("y axis", s.y.as_str()));
                if let Some(c) = &s.color {
                    refs.push(("color grouping", c.as_str()));
                }
            }
        }
        refs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarOptions {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub palette: PaletteName,
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_title: Option<String>,
    #[serde(default)]
    pub y_title: Option<String>,
    #[serde(default)]
    pub italic_x_ticks: bool,
    #[serde(default = "default_bar_width")]
    pub width: u32,
    #[serde(default = "default_bar_height")]
    pub height: u32,
}

fn default_bar_width() -> u32 { 800 }
fn default_bar_height() -> u32 { 500 }

impl BarOptions {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            color: None,
            palette: PaletteName::default(),
            sort: SortMode::default(),
            title: None,
            x_title: None,
            y_title: None,
            italic_x_ticks: false,
            width: default_bar_width(),
            height: default_bar_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieOptions {
    pub names: String,
    pub values: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineOptions {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_title: Option<String>,
    #[serde(default)]
    pub y_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterOptions {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_title: Option<String>,
    #[serde(default)]
    pub y_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_bar_defaults() {
        let opts: ChartOptions =
            serde_json::from_str(r#"{"kind": "bar", "x": "Categoría", "y": "Valor_1"}"#).unwrap();
        let ChartOptions::Bar(bar) = opts else {
            panic!("expected bar options");
        };
        assert_eq!(bar.sort, SortMode::Unsorted);
        assert_eq!(bar.palette, PaletteName::Plotly);
        assert_eq!((bar.width, bar.height), (800, 500));
        assert!(bar.color.is_none());
    }

    #[test]
    fn test_deserialize_sort_and_palette() {
        let opts: ChartOptions = serde_json::from_str(
            r#"{"kind": "bar", "x": "a", "y": "b", "sort": "descending_by_y", "palette": "dark24"}"#,
        )
        .unwrap();
        let ChartOptions::Bar(bar) = opts else {
            panic!("expected bar options");
        };
        assert_eq!(bar.sort, SortMode::DescendingByY);
        assert_eq!(bar.palette, PaletteName::Dark24);
    }

    #[test]
    fn test_deserialize_unknown_palette_rejected() {
        let result: Result<ChartOptions, _> = serde_json::from_str(
            r#"{"kind": "bar", "x": "a", "y": "b", "palette": "rainbow"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pie_requires_values() {
        let result: Result<ChartOptions, _> =
            serde_json::from_str(r#"{"kind": "pie", "names": "a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_column_refs_skip_absent_color() {
        let opts = ChartOptions::Scatter(ScatterOptions {
            x: "a".to_string(),
            y: "b".to_string(),
            color: None,
            title: None,
            x_title: None,
            y_title: None,
        });
        assert_eq!(opts.column_refs(), vec![("x axis", "a"), ("y axis", "b")]);
        assert_eq!(opts.kind(), ChartKind::Scatter);
    }
}
