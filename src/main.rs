//! ptmux: demux Blu-ray disc structures and remux the resulting tracks
//! following release-site conventions.

use clap::{Args, Parser, Subcommand};
use ptmux_config::Config;
use ptmux_disc::MkvmergeParser;
use ptmux_engine::{Context, DemuxOptions, Job, JobResult, MediaKind, RemuxOptions, demuxer, drive, remuxer};
use ptmux_exec::{Executor, Tools};
use ptmux_policy::Registry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ptmux", version, about)]
struct Cli {
    /// Configuration file (TOML or YAML), layered over the user configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split the main playlist of a disc structure into elementary streams.
    #[command(visible_alias = "d")]
    Demux {
        /// Directory containing `BDMV`.
        #[arg(long)]
        bdmv: PathBuf,
        /// Output directory; defaults to the configured one.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        media: Media,
    },
    /// Combine streams into a single Matroska file.
    #[command(visible_alias = "r")]
    Remux {
        /// Input files, combined in the order given.
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Defaults to the name of the first input, without its extension.
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value_t = 0)]
        year: u32,
        /// Release site whose naming and track order apply.
        #[arg(long)]
        site: Option<String>,
        /// Chapters file, e.g. the `chapters.mpls` a demux run leaves next to the streams.
        #[arg(short, long)]
        chapters: Option<PathBuf>,
        #[command(flatten)]
        media: Media,
    },
    /// The graphical interface.
    #[command(visible_alias = "g")]
    Gui,
}

/// Movie, or a single series episode. Movie unless a season is given.
#[derive(Debug, Args)]
struct Media {
    #[arg(long, conflicts_with_all = ["season", "episode"])]
    movie: bool,
    #[arg(long, requires = "episode")]
    season: Option<u32>,
    #[arg(long, requires = "season")]
    episode: Option<u32>,
}
impl Media {
    fn kind(&self) -> MediaKind {
        match (self.season, self.episode) {
            (Some(season), Some(episode)) if !self.movie => MediaKind::Series { season, episode },
            _ => MediaKind::Movie,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_tracing(cli.verbose, &config.general.log_level);

    let result = match run(cli.command, &config).await {
        Ok(Some(result)) => result,
        Ok(None) => return ExitCode::SUCCESS,
        Err(code) => return code,
    };
    match result.into_result() {
        Ok(output) => {
            tracing::info!(output = %output.display(), "Done");
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` wins, then the verbosity flags, then the configured level.
fn init_tracing(verbose: u8, configured: &str) {
    let fallback = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(command: Command, config: &Config) -> Result<Option<JobResult>, ExitCode> {
    let output_dir = |output: Option<PathBuf>| output.unwrap_or_else(|| config.general.output_dir.clone());
    let result = match command {
        Command::Demux { bdmv, output, media } => {
            let ctx = context(config)?;
            let options = DemuxOptions { root: bdmv, output_dir: output_dir(output) };
            let mut job = Job::new(options, media.kind());
            drive(demuxer(&mut job, &ctx).as_mut()).await
        },
        Command::Remux { inputs, output, title, year, site, chapters, media } => {
            let ctx = context(config)?;
            let title = title.or_else(|| default_title(&inputs)).unwrap_or_default();
            let options = RemuxOptions { inputs, output_dir: output_dir(output), title, year, site, chapters };
            let mut job = Job::new(options, media.kind());
            drive(remuxer(&mut job, &ctx).as_mut()).await
        },
        Command::Gui => {
            tracing::info!("The graphical interface is not part of this build");
            return Ok(None);
        },
    };
    Ok(Some(result))
}

fn context(config: &Config) -> Result<Context, ExitCode> {
    let executor = Executor::new(Tools::resolve(&config.tools));
    let parser = Arc::new(MkvmergeParser::new(executor.clone()));
    match Registry::from_config(&config.sites) {
        Ok(sites) => Ok(Context::new(executor, parser, sites)),
        Err(err) => {
            eprintln!("Invalid site configuration: {err:?}");
            Err(ExitCode::FAILURE)
        },
    }
}

fn default_title(inputs: &[PathBuf]) -> Option<String> {
    inputs.first()?.file_stem()?.to_str().map(str::to_string)
}
