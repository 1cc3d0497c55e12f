use serde::Serialize;

use crate::data::Dataset;
use crate::options::ChartKind;
use crate::palette::Palette;

// =============================================================================
// Resolution output
// =============================================================================

/// A fully resolved, renderer-ready chart description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    /// The rows to plot, after any sorting or date coercion
    pub data: Dataset,
    pub body: ChartBody,
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self.body {
            ChartBody::Bar(_) => ChartKind::Bar,
            ChartBody::Pie(_) => ChartKind::Pie,
            ChartBody::Line(_) => ChartKind::Line,
            ChartBody::Scatter(_) => ChartKind::Scatter,
        }
    }

    /// Resolved Y range, for the kinds that have one
    pub fn y_range(&self) -> Option<AxisRange> {
        match &self.body {
            ChartBody::Bar(b) => Some(b.y_range),
            ChartBody::Line(l) => Some(l.y_range),
            ChartBody::Scatter(s) => Some(s.y_range),
            ChartBody::Pie(_) => None,
        }
    }

    /// Column that splits rows into color groups, if any
    pub fn color(&self) -> Option<&str> {
        match &self.body {
            ChartBody::Bar(b) => b.color.as_deref(),
            ChartBody::Scatter(s) => s.color.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartBody {
    Bar(BarSpec),
    Pie(PieSpec),
    Line(LineSpec),
    Scatter(ScatterSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSpec {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub palette: Palette,
    pub y_range: AxisRange,
    pub axis_titles: AxisTitles,
    /// Bars always carry their value as a text label
    pub show_values: bool,
    pub italic_x_ticks: bool,
    pub size: ChartSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSpec {
    pub names: String,
    pub values: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSpec {
    pub x: String,
    pub y: String,
    pub y_range: AxisRange,
    pub axis_titles: AxisTitles,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSpec {
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub y_range: AxisRange,
    pub axis_titles: AxisTitles,
}

/// Closed value interval for an axis. `lower` is not guaranteed to be
/// below `upper` (a non-positive Y maximum inverts it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitles {
    pub x: String,
    pub y: String,
}

/// Pixel dimensions of a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl ChartSize {
    pub const WIDTH_RANGE: (u32, u32) = (400, 1200);
    pub const HEIGHT_RANGE: (u32, u32) = (300, 900);

    /// Clamp requested dimensions into the supported ranges
    pub fn clamped(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(Self::WIDTH_RANGE.0, Self::WIDTH_RANGE.1),
            height: height.clamp(Self::HEIGHT_RANGE.0, Self::HEIGHT_RANGE.1),
        }
    }
}

/// Non-fatal conditions met while resolving
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ResolveWarning {
    /// The X column could not be read as dates; rows were left unsorted
    ChronologicalSortUnavailable { column: String, value: String },
}

impl std::fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveWarning::ChronologicalSortUnavailable { column, value } => write!(
                f,
                "column '{}' cannot be converted to dates (value '{}'); showing rows unsorted",
                column, value
            ),
        }
    }
}

/// A resolved chart plus any warnings raised on the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub spec: ChartSpec,
    pub warnings: Vec<ResolveWarning>,
}

impl Resolution {
    /// True when the result differs from what was literally requested
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
