// Library exports for sheetplot

pub mod csv_reader;
pub mod data;
pub mod error;
pub mod graph;
pub mod ir;
pub mod options;
pub mod palette;
pub mod resolve;
pub mod scale;
pub mod telemetry;
pub mod transform;
pub mod xlsx_reader;

pub use data::{Column, Dataset, Value, Workbook};
pub use error::{DataError, ResolveError};
pub use ir::{ChartSpec, Resolution, ResolveWarning};
pub use options::{ChartKind, ChartOptions, SortMode};
pub use resolve::resolve;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

/// Output settings for the renderer. Bar charts override the size with
/// their own resolved dimensions.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
        }
    }
}
