use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::cellvalue::{compare_cell_values, CellValueComparison};
use crate::error::Result;
use crate::extent::{compare_extent, ExtentComparison};
use crate::gis::{self, EngineSession, RasterProperties};
use crate::grid::Grid;
use crate::report::{unique_output_path, QcReport, ReportColumn};
use crate::resolver::{resolve, RasterInput};
use crate::runlog::RunLog;
use crate::status::ComparisonStatus;
use crate::tier::{ComparisonPair, Tier};

/// Inputs for one QC run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: RasterInput,
    /// Folder the `Output_<prefix>_<study>` tree is created under; defaults to
    /// the current directory.
    pub output_folder: Option<PathBuf>,
    /// Overrides the default `<prefix>_<study>_Raster_QC_Results.csv` name.
    pub report_name: Option<String>,
}

/// Both statuses of one evaluated comparison pair.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub pair: ComparisonPair,
    pub extent: ComparisonStatus,
    pub cell_value: ComparisonStatus,
}

/// What a finished run produced and how it should terminate.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<PairOutcome>,
    pub report_path: PathBuf,
    pub log_path: PathBuf,
    pub shapefiles_folder: PathBuf,
    /// True when any stage errored and left a comparison or metadata column
    /// skipped. Distinct from QC violations, which are valid results.
    pub stage_error: bool,
}

impl RunSummary {
    /// 0: all comparisons passed. 1: at least one Fail or Warning.
    /// 2: a stage error prevented part of the run from completing.
    /// (Resolution and configuration errors never reach a summary; callers
    /// map those to 3.)
    pub fn exit_code(&self) -> u8 {
        if self.stage_error {
            2
        } else if self
            .outcomes
            .iter()
            .any(|o| o.extent.is_violation() || o.cell_value.is_violation())
        {
            1
        } else {
            0
        }
    }
}

type StageResult<T> = std::result::Result<T, String>;

struct PairComputation {
    pair: ComparisonPair,
    extent: StageResult<ExtentComparison>,
    cell_value: StageResult<CellValueComparison>,
}

/// Run the full QC checklist: resolve inputs, load rasters, evaluate every
/// pair, persist evidence artifacts and write the CSV report and run log.
///
/// Per-stage failures degrade to `Skipped` statuses so the report always
/// materializes; only resolution, configuration and workspace-setup errors
/// abort the run.
pub fn run(options: &PipelineOptions) -> Result<RunSummary> {
    let started = Instant::now();
    let session = EngineSession::acquire()?;
    let set = resolve(&options.input)?;

    let base = match &options.output_folder {
        Some(folder) => folder.clone(),
        None => env::current_dir()?,
    };
    let run_tag = format!("{}_{}", set.prefix, set.study_type);
    let output_folder = base.join(format!("Output_{run_tag}"));
    let shapefiles_folder = output_folder.join(format!("Shapefiles_{run_tag}"));
    fs::create_dir_all(&shapefiles_folder)?;
    // secondary artifacts land here and vanish with the run
    let scratch = tempfile::tempdir()?;

    let mut log = RunLog::create(&output_folder, &format!("{run_tag}_Tool_log.txt"))?;
    log.message(&format!(
        "Raster QC run for {run_tag} started at {}",
        chrono::Local::now().format("%Y-%m-%d %X")
    ));

    let mut stage_error = false;

    log.stage_started("Load rasters");
    let mut grids: BTreeMap<Tier, StageResult<Grid>> = BTreeMap::new();
    let mut load_failed = false;
    for tier in set.tiers() {
        let Some(path) = set.path(tier) else { continue };
        match gis::read_grid(&session, path) {
            Ok(grid) => {
                grids.insert(tier, Ok(grid));
            }
            Err(err) => {
                load_failed = true;
                log.stage_failed("Load rasters", &format!("{}: {err}", path.display()));
                grids.insert(tier, Err(err.to_string()));
            }
        }
    }
    if !load_failed {
        log.stage_succeeded("Load rasters");
    }
    stage_error |= load_failed;

    let unavailable = |tier: Tier| -> Option<String> {
        match grids.get(&tier) {
            Some(Ok(_)) => None,
            Some(Err(err)) => Some(format!("{} failed to load: {err}", tier.token())),
            None => Some(format!("{} was not resolved", tier.token())),
        }
    };

    // pure comparisons fan out across pairs; artifact writes stay sequential
    let computations: Vec<PairComputation> = set
        .pairs()
        .into_par_iter()
        .map(|pair| match (grids.get(&pair.lower), grids.get(&pair.higher)) {
            (Some(Ok(lower)), Some(Ok(higher))) => PairComputation {
                pair,
                extent: compare_extent(pair, lower, higher).map_err(|e| e.to_string()),
                cell_value: compare_cell_values(pair, lower, higher).map_err(|e| e.to_string()),
            },
            _ => {
                let reason = unavailable(pair.lower)
                    .or_else(|| unavailable(pair.higher))
                    .unwrap_or_else(|| "input raster unavailable".to_string());
                PairComputation {
                    pair,
                    extent: Err(reason.clone()),
                    cell_value: Err(reason),
                }
            }
        })
        .collect();

    let srs_wkt = match gis::read_srs_wkt(&session, &set.freeboard[0]) {
        Ok(wkt) => wkt,
        Err(err) => {
            warn!(%err, "could not read the tier-0 spatial reference; artifacts will carry none");
            None
        }
    };

    log.stage_started("Compare extent");
    let mut extent_failed = false;
    let mut extent_statuses: Vec<ComparisonStatus> = Vec::with_capacity(computations.len());
    for comp in &computations {
        let status = match &comp.extent {
            Ok(extent) => {
                let info_path = scratch
                    .path()
                    .join(format!("{}.shp", comp.pair.extent_info_stem()));
                if let Err(err) = gis::write_polygon_shapefile(
                    &session,
                    &info_path,
                    srs_wkt.as_deref(),
                    &extent.forward.features,
                ) {
                    warn!(pair = %comp.pair.label(), %err, "secondary extent artifact not written");
                }

                let fail_path = shapefiles_folder
                    .join(format!("{}.shp", comp.pair.extent_fail_stem()));
                match gis::write_polygon_shapefile(
                    &session,
                    &fail_path,
                    srs_wkt.as_deref(),
                    &extent.reverse.features,
                ) {
                    Ok(count) => ComparisonStatus::extent(count, fail_path),
                    Err(err) => {
                        extent_failed = true;
                        log.stage_failed(
                            "Compare extent",
                            &format!("{}: {err}", fail_path.display()),
                        );
                        ComparisonStatus::skipped(format!("evidence artifact write failed: {err}"))
                    }
                }
            }
            Err(reason) => ComparisonStatus::skipped(reason.clone()),
        };
        log.message(&format!(
            "Extent compare {} {}",
            comp.pair.label(),
            status_line(&status)
        ));
        extent_statuses.push(status);
    }
    if !extent_failed {
        log.stage_succeeded("Compare extent");
    }
    stage_error |= extent_failed;

    log.stage_started("Compare cell value");
    let mut cell_failed = false;
    let mut cell_statuses: Vec<ComparisonStatus> = Vec::with_capacity(computations.len());
    for comp in &computations {
        let status = match &comp.cell_value {
            Ok(cell) => {
                // the point artifact is written even when empty so reviewers
                // can open it and confirm the zero-record result
                let points_path = shapefiles_folder
                    .join(format!("{}.shp", comp.pair.cell_points_stem()));
                match gis::write_point_shapefile(
                    &session,
                    &points_path,
                    srs_wkt.as_deref(),
                    comp.pair,
                    &cell.points,
                ) {
                    Ok(count) => {
                        let status = ComparisonStatus::cell_value(count, points_path);
                        if status.is_violation() {
                            log.message(&comp.pair.violation_message());
                        }
                        status
                    }
                    Err(err) => {
                        cell_failed = true;
                        log.stage_failed(
                            "Compare cell value",
                            &format!("{}: {err}", points_path.display()),
                        );
                        ComparisonStatus::skipped(format!("evidence artifact write failed: {err}"))
                    }
                }
            }
            Err(reason) => ComparisonStatus::skipped(reason.clone()),
        };
        log.message(&format!(
            "Cell value compare {} {}",
            comp.pair.label(),
            status_line(&status)
        ));
        cell_statuses.push(status);
    }
    if !cell_failed {
        log.stage_succeeded("Compare cell value");
    }
    stage_error |= cell_failed;

    log.stage_started("Read raster properties");
    let mut properties: BTreeMap<Tier, Option<RasterProperties>> = BTreeMap::new();
    let mut props_failed = false;
    for tier in set.tiers() {
        let Some(path) = set.path(tier) else { continue };
        let props = match gis::read_properties(&session, path) {
            Ok(props) => Some(props),
            Err(err) => {
                props_failed = true;
                log.stage_failed(
                    "Read raster properties",
                    &format!("{}: {err}", path.display()),
                );
                None
            }
        };
        properties.insert(tier, props);
    }
    if !props_failed {
        log.stage_succeeded("Read raster properties");
    }
    stage_error |= props_failed;

    let outcomes: Vec<PairOutcome> = computations
        .iter()
        .zip(extent_statuses)
        .zip(cell_statuses)
        .map(|((comp, extent), cell_value)| PairOutcome {
            pair: comp.pair,
            extent,
            cell_value,
        })
        .collect();

    // statuses land in the column of each pair's higher member, so FVA0
    // carries the auxiliary comparison when PCT02 is present
    let columns: Vec<ReportColumn> = set
        .tiers()
        .into_iter()
        .map(|tier| {
            let outcome = outcomes.iter().find(|o| o.pair.higher == tier);
            ReportColumn {
                tier,
                properties: properties.get(&tier).cloned().flatten(),
                compared_against: outcome.map(|o| o.pair.lower.token().to_string()),
                extent: outcome.map(|o| o.extent.clone()),
                cell_value: outcome.map(|o| o.cell_value.clone()),
            }
        })
        .collect();

    log.stage_started("Create QC spreadsheet");
    let report_name = options
        .report_name
        .clone()
        .unwrap_or_else(|| format!("{run_tag}_Raster_QC_Results.csv"));
    let report_path = unique_output_path(&output_folder, &report_name);
    let report = QcReport { columns };
    match report.write_csv(&report_path) {
        Ok(()) => log.stage_succeeded("Create QC spreadsheet"),
        Err(err) => {
            stage_error = true;
            log.stage_failed(
                "Create QC spreadsheet",
                &format!("{}: {err}", report_path.display()),
            );
        }
    }

    let summary = RunSummary {
        outcomes,
        report_path,
        log_path: log.path().to_path_buf(),
        shapefiles_folder,
        stage_error,
    };
    log.message(&format!(
        "QC run finished in {:.2}s with exit status {}",
        started.elapsed().as_secs_f64(),
        summary.exit_code()
    ));
    info!(report = %summary.report_path.display(), "QC report written");
    Ok(summary)
}

fn status_line(status: &ComparisonStatus) -> String {
    match status {
        ComparisonStatus::Pass => "Pass!".to_string(),
        ComparisonStatus::Fail { evidence, count } => {
            format!("Fail! {count} feature(s), see {}", evidence.display())
        }
        ComparisonStatus::Warning { evidence, count } => {
            format!("Warning! {count} location(s), see {}", evidence.display())
        }
        ComparisonStatus::Skipped { reason } => format!("skipped: {reason}"),
    }
}
