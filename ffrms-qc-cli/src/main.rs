use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing::error;

use ffrms_qc::config::QcConfig;
use ffrms_qc::pipeline::{self, PipelineOptions, RunSummary};
use ffrms_qc::resolver::RasterInput;

#[derive(Parser, Debug)]
#[command(author, version, about = "Automated QC checklist for FFRMS freeboard raster sets", long_about = None)]
struct Args {
    /// Folder holding the freeboard rasters, matched by filename token
    #[arg(value_name = "RASTERS_DIR")]
    rasters_folder: Option<PathBuf>,

    /// TOML run configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Explicit FVA0 raster (all four tiers must be given together)
    #[arg(long, value_name = "TIF", requires = "fva1")]
    fva0: Option<PathBuf>,

    /// Explicit FVA1 raster
    #[arg(long, value_name = "TIF", requires = "fva2")]
    fva1: Option<PathBuf>,

    /// Explicit FVA2 raster
    #[arg(long, value_name = "TIF", requires = "fva3")]
    fva2: Option<PathBuf>,

    /// Explicit FVA3 raster
    #[arg(long, value_name = "TIF", requires = "fva0")]
    fva3: Option<PathBuf>,

    /// Optional 0.2%-annual-chance raster
    #[arg(long, value_name = "TIF", requires = "fva0")]
    pct02: Option<PathBuf>,

    /// Folder the output tree is created under (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Report filename override
    #[arg(long, value_name = "NAME")]
    report_name: Option<String>,

    /// Worker threads (default: CPU core count)
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    match run(args) {
        Ok(summary) => ExitCode::from(summary.exit_code()),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(3)
        }
    }
}

fn run(args: Args) -> Result<RunSummary> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let config = match &args.config {
        Some(path) => QcConfig::from_file(path)?,
        None => QcConfig::default(),
    };

    let options = PipelineOptions {
        input: select_input(&args, &config)?,
        output_folder: args.output.clone().or_else(|| config.output_folder.clone()),
        report_name: args.report_name.clone().or_else(|| config.report_name.clone()),
    };
    Ok(pipeline::run(&options)?)
}

/// Explicit raster flags beat the config file, which beats the positional
/// folder argument.
fn select_input(args: &Args, config: &QcConfig) -> Result<RasterInput> {
    if let (Some(fva0), Some(fva1), Some(fva2), Some(fva3)) =
        (&args.fva0, &args.fva1, &args.fva2, &args.fva3)
    {
        return Ok(RasterInput::Explicit {
            fva0: fva0.clone(),
            fva1: fva1.clone(),
            fva2: fva2.clone(),
            fva3: fva3.clone(),
            pct02: args.pct02.clone(),
        });
    }
    if args.config.is_some() {
        return Ok(config.raster_input()?);
    }
    if let Some(folder) = &args.rasters_folder {
        return Ok(RasterInput::Folder(folder.clone()));
    }
    Ok(config.raster_input()?)
}
