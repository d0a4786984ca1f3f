use acts_vis_rs::analyses;
use acts_vis_rs::config::AnalysisConfig;
use acts_vis_rs::vertexing::{FittedVertex, VertexFinderKind};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plots and vertex fitting for track reconstruction studies")]
struct Cli {
    /// Path to config TOML; built-in defaults are used when not given
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input tables (overrides config)
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Directory the plots are written to (overrides config)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Density of a single track around its impact parameters
    Gaussian,
    /// Summed density of all tracks with truth vertices overlaid
    ArtificialTrackDensities {
        /// Number of time points; 1 gives the time-independent density
        #[arg(long)]
        n_t: Option<usize>,
    },
    /// Binned densities written by the vertex finder
    TrackDensities,
    /// Track-vertex compatibilities with and without time
    Compatibilities,
    /// Analytical against numerical Jacobians
    CompareJacobians,
    /// Run the vertex finder over particle and track tables
    VertexFitting {
        /// AMVF, Iterative or Truth
        #[arg(long)]
        vertex_finder: Option<VertexFinderKind>,
        /// Truth particle table
        #[arg(long)]
        particles: Option<PathBuf>,
        /// Track summary table
        #[arg(long)]
        tracks: Option<PathBuf>,
    },
    /// Every plotting analysis
    All,
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config: AnalysisConfig = match &cli.config {
        Some(path) => AnalysisConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    config.override_paths(cli.input_dir.clone(), cli.output_dir.clone());
    return Ok(config);
}

fn run(cli: Cli) -> Result<()> {
    let mut config: AnalysisConfig = load_config(&cli)?;
    info!("input {}, output {}", config.paths.input_dir.display(), config.paths.output_dir.display());

    match cli.command {
        Command::Gaussian => analyses::gaussian_plot(&config)?,
        Command::ArtificialTrackDensities { n_t } => {
            if let Some(n_t) = n_t {
                config.track_density.n_t = n_t;
            }
            analyses::artificial_track_densities(&config)?;
        }
        Command::TrackDensities => analyses::track_densities(&config)?,
        Command::Compatibilities => analyses::compatibilities(&config)?,
        Command::CompareJacobians => analyses::compare_jacobians_plot(&config)?,
        Command::VertexFitting {
            vertex_finder,
            particles,
            tracks,
        } => {
            if let Some(vertex_finder) = vertex_finder {
                config.vertex_fitting.vertex_finder = vertex_finder;
            }
            if let Some(particles) = particles {
                config.vertex_fitting.particles = particles;
            }
            if let Some(tracks) = tracks {
                config.vertex_fitting.tracks = tracks;
            }
            let vertices: Vec<FittedVertex> = analyses::vertex_fitting(&config)?;
            info!("vertex fitting finished with {} vertices", vertices.len());
        }
        Command::All => analyses::run_all(&config)?,
    }
    return Ok(());
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli: Cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        return ExitCode::FAILURE;
    }
    return ExitCode::SUCCESS;
}
