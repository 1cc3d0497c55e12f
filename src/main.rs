use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sheetplot::csv_reader;
use sheetplot::graph;
use sheetplot::options::{BarOptions, LineOptions, PieOptions, ScatterOptions};
use sheetplot::palette::PaletteName;
use sheetplot::telemetry;
use sheetplot::xlsx_reader;
use sheetplot::{ChartKind, ChartOptions, Dataset, OutputFormat, RenderOptions, SortMode, Workbook};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Png,
    Svg,
    /// The resolved chart description as JSON
    Spec,
    /// The loaded table as CSV, without drawing anything
    Table,
}

#[derive(Parser, Debug)]
#[command(name = "sheetplot")]
#[command(about = "Render bar, pie, line and scatter charts from tabular data", long_about = None)]
struct Args {
    /// Data file (.csv, .json, .xlsx, .xls or .ods), or `-` for CSV on stdin.
    /// Defaults to a built-in sample table
    #[arg(long)]
    data: Option<PathBuf>,

    /// Sheet to read from a workbook (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// JSON file holding the chart options (replaces the chart flags)
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long, value_enum)]
    kind: Option<ChartKind>,

    /// X axis column (bar, line, scatter)
    #[arg(long)]
    x: Option<String>,

    /// Y axis column (bar, line, scatter)
    #[arg(long)]
    y: Option<String>,

    /// Column used to color groups (bar, scatter)
    #[arg(long)]
    color: Option<String>,

    /// Slice label column (pie)
    #[arg(long)]
    names: Option<String>,

    /// Slice size column (pie)
    #[arg(long)]
    values: Option<String>,

    #[arg(long, value_enum, default_value_t = SortMode::Unsorted)]
    sort: SortMode,

    #[arg(long, value_enum, default_value_t = PaletteName::Plotly)]
    palette: PaletteName,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    x_title: Option<String>,

    #[arg(long)]
    y_title: Option<String>,

    /// Draw X tick labels in italics (bar)
    #[arg(long)]
    italic_x: bool,

    /// Chart width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Chart height in pixels
    #[arg(long)]
    height: Option<u32>,

    #[arg(long, value_enum, default_value_t = Emit::Png)]
    emit: Emit,

    /// Write output here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    let dataset = load_dataset(&args)?;
    if args.emit == Emit::Table {
        let table = csv_reader::write_csv(&dataset).context("Failed to write table")?;
        return write_output(args.output.as_deref(), &table);
    }
    if dataset.is_empty() {
        info!("The table is empty. Add data to draw a chart.");
        return Ok(());
    }
    debug!(rows = dataset.n_rows(), columns = dataset.columns().len(), "loaded table");

    let options = match &args.options {
        Some(path) => read_options_file(path)?,
        None => options_from_flags(&args)?,
    };

    let resolution = sheetplot::resolve(&dataset, &options).context("Failed to build chart")?;

    let bytes = match args.emit {
        Emit::Spec | Emit::Table => {
            serde_json::to_vec_pretty(&resolution).context("Failed to serialize chart")?
        }
        Emit::Png | Emit::Svg => {
            let render_options = RenderOptions {
                width: args.width.unwrap_or(RenderOptions::default().width),
                height: args.height.unwrap_or(RenderOptions::default().height),
                format: if args.emit == Emit::Svg { OutputFormat::Svg } else { OutputFormat::Png },
            };
            graph::render_chart(&resolution.spec, &render_options).context("Failed to render chart")?
        }
    };

    write_output(args.output.as_deref(), &bytes)
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => fs::write(path, bytes)
            .with_context(|| format!("Failed to write '{}'", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(bytes).context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

fn load_dataset(args: &Args) -> Result<Dataset> {
    let Some(path) = &args.data else {
        info!("No data file given, using the default table");
        return Ok(Dataset::default_table());
    };

    let workbook = if path.as_os_str() == "-" {
        let csv = csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")?;
        Workbook::single("stdin", Dataset::from_csv(csv)?)
    } else if has_extension(path, "json") {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not valid JSON", path.display()))?;
        Workbook::from_json(&json)?
    } else if SPREADSHEET_EXTENSIONS.iter().any(|ext| has_extension(path, ext)) {
        xlsx_reader::read_workbook(path)?
    } else {
        let csv = csv_reader::read_csv_from_path(path)?;
        let sheet = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Sheet1".to_string());
        Workbook::single(sheet, Dataset::from_csv(csv)?)
    };

    debug!(sheets = ?workbook.sheet_names(), "opened workbook");
    Ok(workbook.into_sheet(args.sheet.as_deref())?)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn read_options_file(path: &Path) -> Result<ChartOptions> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid chart options in '{}'", path.display()))
}

fn options_from_flags(args: &Args) -> Result<ChartOptions> {
    let kind = args
        .kind
        .context("No chart selected: pass --kind or --options FILE")?;

    let required = |value: &Option<String>, flag: &str| -> Result<String> {
        value
            .clone()
            .with_context(|| format!("--{} is required for {} charts", flag, kind))
    };

    let options = match kind {
        ChartKind::Bar => {
            let defaults = BarOptions::new(required(&args.x, "x")?, required(&args.y, "y")?);
            ChartOptions::Bar(BarOptions {
                color: args.color.clone(),
                palette: args.palette,
                sort: args.sort,
                title: args.title.clone(),
                x_title: args.x_title.clone(),
                y_title: args.y_title.clone(),
                italic_x_ticks: args.italic_x,
                width: args.width.unwrap_or(defaults.width),
                height: args.height.unwrap_or(defaults.height),
                ..defaults
            })
        }
        ChartKind::Pie => ChartOptions::Pie(PieOptions {
            names: required(&args.names, "names")?,
            values: required(&args.values, "values")?,
            title: args.title.clone(),
        }),
        ChartKind::Line => ChartOptions::Line(LineOptions {
            x: required(&args.x, "x")?,
            y: required(&args.y, "y")?,
            title: args.title.clone(),
            x_title: args.x_title.clone(),
            y_title: args.y_title.clone(),
        }),
        ChartKind::Scatter => ChartOptions::Scatter(ScatterOptions {
            x: required(&args.x, "x")?,
            y: required(&args.y, "y")?,
            color: args.color.clone(),
            title: args.title.clone(),
            x_title: args.x_title.clone(),
            y_title: args.y_title.clone(),
        }),
    };

    Ok(options)
}
