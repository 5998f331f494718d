#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use repgrid_measures::config::{load_config_from_path, IndexConfig};
use repgrid_measures::conflict::DetailSelection;
use repgrid_measures::correlation::ElementCoefficient;
use repgrid_measures::{
    bias, build_envelope, conflict_balance_magnitude, conflict_balance_sign, conflict_triangle,
    dilemmas, intensity, pvaff, render_envelope_text, variability, ConfigError, Grid, IndexError,
    IndexReport, RenderOptions,
};

#[derive(Parser)]
#[command(name = "repgrid", version, about = "Structural indices for repertory grids")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Grid JSON file
    #[arg(long)]
    grid: PathBuf,
    /// Index config JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    digits: Option<u32>,
    /// Truncate labels to this many characters
    #[arg(long)]
    trim: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct ScaleArgs {
    /// Override the scale minimum
    #[arg(long, allow_hyphen_values = true)]
    min: Option<f64>,
    /// Override the scale maximum
    #[arg(long, allow_hyphen_values = true)]
    max: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Distance of construct means from the scale midpoint
    Bias {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        scale: ScaleArgs,
    },
    /// Spread of ratings around construct means
    Variability {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        scale: ScaleArgs,
    },
    /// Variance accounted for by the first principal component
    Pvaff {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Average squared construct and element correlations
    Intensity {
        #[command(flatten)]
        common: CommonArgs,
        /// Correlate elements with Cohen's rc instead of Pearson
        #[arg(long)]
        cohen: bool,
    },
    /// Conflict from the sign balance of correlation triads
    Conflict1 {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Conflict from the magnitude balance of correlation triads
    Conflict2 {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        crit: Option<f64>,
    },
    /// Conflict from triangle-inequality violations
    Conflict3 {
        #[command(flatten)]
        common: CommonArgs,
        /// Minkowski power of construct distances
        #[arg(long)]
        power: Option<f64>,
        /// Elements to break down (comma separated indices)
        #[arg(long, value_delimiter = ',')]
        elements: Vec<usize>,
        /// Constructs to break down (comma separated indices)
        #[arg(long, value_delimiter = ',')]
        constructs: Vec<usize>,
        /// Break down every element with at least this share of conflicts (%)
        #[arg(long)]
        element_threshold: Option<f64>,
        /// Break down every construct with at least this share of conflicts (%)
        #[arg(long)]
        construct_threshold: Option<f64>,
    },
    /// Implicative dilemmas between a self and an ideal-self element
    Dilemma {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long = "self")]
        self_element: Option<usize>,
        #[arg(long)]
        ideal: Option<usize>,
        /// 0 = midpoint, 1 = difference
        #[arg(long, allow_hyphen_values = true)]
        mode: Option<i64>,
        #[arg(long)]
        diff_congruent: Option<f64>,
        #[arg(long)]
        diff_discrepant: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        r_min: Option<f64>,
        /// Judge pairs on correlations without self and ideal
        #[arg(long)]
        exclude: bool,
    },
    /// Every index with config-file settings
    All {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Clone, Copy)]
enum IndexKind {
    Bias,
    Variability,
    Pvaff,
    Intensity,
    SignBalance,
    MagnitudeBalance,
    Triangle,
    Dilemma,
}

const ALL_INDICES: [IndexKind; 8] = [
    IndexKind::Bias,
    IndexKind::Variability,
    IndexKind::Pvaff,
    IndexKind::Intensity,
    IndexKind::SignBalance,
    IndexKind::MagnitudeBalance,
    IndexKind::Triangle,
    IndexKind::Dilemma,
];

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let (common, config, kinds) = prepare(command)?;
    config.validate()?;

    let raw = std::fs::read_to_string(&common.grid)?;
    let grid = Grid::from_json_str(&raw)?;
    info!(
        constructs = grid.constructs().len(),
        elements = grid.elements().len(),
        "grid loaded"
    );

    let lenient = kinds.len() > 1;
    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        match compute(kind, &grid, &config) {
            Ok(report) => reports.push(report),
            Err(err @ IndexError::InsufficientData { .. }) if lenient => {
                warn!(index = ?kind, error = %err, "index skipped");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let envelope = build_envelope(&grid, reports);
    let rendered = match common.format {
        OutputFormat::Json => serde_json::to_string_pretty(&envelope)?,
        OutputFormat::Text => {
            let opts = RenderOptions {
                digits: config.digits(),
                trim: config.trim.or(RenderOptions::default().trim),
            };
            render_envelope_text(&envelope, &grid, &opts)
        }
    };
    match &common.out {
        Some(path) => std::fs::write(path, rendered)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn base_config(common: &CommonArgs) -> Result<IndexConfig, Box<dyn std::error::Error>> {
    let mut config = match &common.config {
        Some(path) => load_config_from_path(path)?,
        None => IndexConfig::default(),
    };
    if common.digits.is_some() {
        config.digits = common.digits;
    }
    if common.trim.is_some() {
        config.trim = common.trim;
    }
    Ok(config)
}

fn apply_scale(config: &mut IndexConfig, scale: &ScaleArgs) {
    if scale.min.is_some() {
        config.basic.min = scale.min;
    }
    if scale.max.is_some() {
        config.basic.max = scale.max;
    }
}

fn detail_selection(
    indices: Vec<usize>,
    threshold: Option<f64>,
    flag: &str,
) -> Result<Option<DetailSelection>, Box<dyn std::error::Error>> {
    match (indices.is_empty(), threshold) {
        (true, None) => Ok(None),
        (false, None) => Ok(Some(DetailSelection::Indices(indices))),
        (true, Some(t)) => Ok(Some(DetailSelection::Threshold(t))),
        (false, Some(_)) => {
            Err(format!("--{flag}s and --{flag}-threshold are mutually exclusive").into())
        }
    }
}

fn prepare(
    command: Commands,
) -> Result<(CommonArgs, IndexConfig, Vec<IndexKind>), Box<dyn std::error::Error>> {
    Ok(match command {
        Commands::Bias { common, scale } => {
            let mut config = base_config(&common)?;
            apply_scale(&mut config, &scale);
            (common, config, vec![IndexKind::Bias])
        }
        Commands::Variability { common, scale } => {
            let mut config = base_config(&common)?;
            apply_scale(&mut config, &scale);
            (common, config, vec![IndexKind::Variability])
        }
        Commands::Pvaff { common } => {
            let config = base_config(&common)?;
            (common, config, vec![IndexKind::Pvaff])
        }
        Commands::Intensity { common, cohen } => {
            let mut config = base_config(&common)?;
            if cohen {
                config.intensity.coefficient = Some(ElementCoefficient::CohenRc);
            }
            (common, config, vec![IndexKind::Intensity])
        }
        Commands::Conflict1 { common } => {
            let config = base_config(&common)?;
            (common, config, vec![IndexKind::SignBalance])
        }
        Commands::Conflict2 { common, crit } => {
            let mut config = base_config(&common)?;
            if crit.is_some() {
                config.conflict.crit = crit;
            }
            (common, config, vec![IndexKind::MagnitudeBalance])
        }
        Commands::Conflict3 {
            common,
            power,
            elements,
            constructs,
            element_threshold,
            construct_threshold,
        } => {
            let mut config = base_config(&common)?;
            if power.is_some() {
                config.conflict.power = power;
            }
            if let Some(sel) = detail_selection(elements, element_threshold, "element")? {
                config.conflict.element_detail = Some(sel);
            }
            if let Some(sel) = detail_selection(constructs, construct_threshold, "construct")? {
                config.conflict.construct_detail = Some(sel);
            }
            (common, config, vec![IndexKind::Triangle])
        }
        Commands::Dilemma {
            common,
            self_element,
            ideal,
            mode,
            diff_congruent,
            diff_discrepant,
            r_min,
            exclude,
        } => {
            let mut config = base_config(&common)?;
            let d = &mut config.dilemma;
            if self_element.is_some() {
                d.self_element = self_element;
            }
            if ideal.is_some() {
                d.ideal_element = ideal;
            }
            if mode.is_some() {
                d.mode = mode;
            }
            if diff_congruent.is_some() {
                d.diff_congruent = diff_congruent;
            }
            if diff_discrepant.is_some() {
                d.diff_discrepant = diff_discrepant;
            }
            if r_min.is_some() {
                d.r_min = r_min;
            }
            if exclude {
                d.exclude = Some(true);
            }
            (common, config, vec![IndexKind::Dilemma])
        }
        Commands::All { common } => {
            let config = base_config(&common)?;
            (common, config, ALL_INDICES.to_vec())
        }
    })
}

fn compute(kind: IndexKind, grid: &Grid, config: &IndexConfig) -> Result<IndexReport, IndexError> {
    Ok(match kind {
        IndexKind::Bias => IndexReport::Bias(bias(grid, &config.basic_options())?),
        IndexKind::Variability => {
            IndexReport::Variability(variability(grid, &config.basic_options())?)
        }
        IndexKind::Pvaff => IndexReport::Pvaff(pvaff(grid)?),
        IndexKind::Intensity => {
            IndexReport::Intensity(intensity(grid, &config.intensity_options())?)
        }
        IndexKind::SignBalance => IndexReport::SignBalance(conflict_balance_sign(grid)?),
        IndexKind::MagnitudeBalance => IndexReport::MagnitudeBalance(conflict_balance_magnitude(
            grid,
            &config.magnitude_options(),
        )?),
        IndexKind::Triangle => {
            IndexReport::Triangle(conflict_triangle(grid, &config.triangle_options())?)
        }
        IndexKind::Dilemma => {
            let opts = config.dilemma_options().map_err(|e| match e {
                ConfigError::Index(inner) => inner,
                other => IndexError::invalid(other.to_string()),
            })?;
            IndexReport::Dilemma(dilemmas(grid, &opts)?)
        }
    })
}
