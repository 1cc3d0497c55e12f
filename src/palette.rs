//! Named qualitative color palettes for discrete color groups.

use anyhow::{Context, Result};
use clap::ValueEnum;
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

// =============================================================================
// Qualitative Color Palettes
// =============================================================================

/// Plotly default sequence
pub const PLOTLY: &[&str] = &[
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a",
    "#19d3f3", "#ff6692", "#b6e880", "#ff97ff", "#fecb52",
];

/// CARTO Prism
pub const PRISM: &[&str] = &[
    "#5f4690", "#1d6996", "#38a6a5", "#0f8554", "#73af48", "#edad08",
    "#e17c05", "#cc503e", "#94346e", "#6f4070", "#666666",
];

/// Dark 24
pub const DARK24: &[&str] = &[
    "#2e91e5", "#e15f99", "#1ca71c", "#fb0d0d", "#da16ff", "#222a2a",
    "#b68100", "#750d86", "#eb663b", "#511cfb", "#00a08b", "#fb00d1",
    "#fc0080", "#b2828d", "#6c7c32", "#778aae", "#862a16", "#a777f1",
    "#620042", "#1616a7", "#da60ca", "#6c4516", "#0d2a63", "#af0038",
];

/// CARTO Pastel
pub const PASTEL: &[&str] = &[
    "#66c5cc", "#f6cf71", "#f89c74", "#dcb0f2", "#87c55f", "#9eb9f3",
    "#fe88b1", "#c9db74", "#8be0a4", "#b497e7", "#b3b3b3",
];

/// The palettes a bar chart may be colored with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaletteName {
    #[default]
    Plotly,
    Prism,
    Dark24,
    Pastel,
}

impl PaletteName {
    pub fn colors(self) -> &'static [&'static str] {
        match self {
            PaletteName::Plotly => PLOTLY,
            PaletteName::Prism => PRISM,
            PaletteName::Dark24 => DARK24,
            PaletteName::Pastel => PASTEL,
        }
    }
}

/// A resolved palette: the ordered color sequence groups cycle through
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Palette {
    pub name: PaletteName,
    pub colors: Vec<String>,
}

impl Palette {
    pub fn resolve(name: PaletteName) -> Self {
        Self {
            name,
            colors: name.colors().iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Color for the `index`-th group, wrapping around the sequence
    pub fn color_at(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    pub fn rgb_at(&self, index: usize) -> Result<RGBColor> {
        parse_rgb(self.color_at(index))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::resolve(PaletteName::default())
    }
}

/// Parse a CSS color string into a plotters color (alpha dropped)
pub fn parse_rgb(color: &str) -> Result<RGBColor> {
    let parsed = csscolorparser::parse(color)
        .with_context(|| format!("Invalid color '{}'", color))?;
    let [r, g, b, _] = parsed.to_rgba8();
    Ok(RGBColor(r, g, b))
}
