//! End-to-end pipeline runs against small generated GeoTIFF sets.

use std::fs;
use std::path::Path;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use tempfile::TempDir;

use ffrms_qc::gis::EngineSession;
use ffrms_qc::pipeline::{run, PipelineOptions};
use ffrms_qc::resolver::RasterInput;
use ffrms_qc::QcError;

const NODATA: f64 = -9999.0;

fn gdal_available() -> bool {
    EngineSession::acquire().is_ok()
}

/// Writes a single-band f64 GeoTIFF on a 10 m UTM grid.
fn write_tif(path: &Path, cols: usize, rows: usize, values: Vec<f64>) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f64, _>(path, cols, rows, 1)
        .unwrap();
    dataset
        .set_geo_transform(&[500_000.0, 10.0, 0.0, 4_000_000.0, 0.0, -10.0])
        .unwrap();
    let srs = SpatialRef::from_epsg(26915).unwrap();
    dataset.set_projection(&srs.to_wkt().unwrap()).unwrap();

    let mut band = dataset.rasterband(1).unwrap();
    band.set_no_data_value(Some(NODATA)).unwrap();
    let mut buffer = Buffer::new((cols, rows), values);
    band.write((0, 0), (cols, rows), &mut buffer).unwrap();
}

fn seed_tier(dir: &Path, token: &str, values: Vec<f64>) {
    let name = format!("Anytown_C_1234_{token}_Riverine_01.tif");
    write_tif(&dir.join(name), values.len(), 1, values);
}

fn options(rasters: &Path, output: &Path) -> PipelineOptions {
    PipelineOptions {
        input: RasterInput::Folder(rasters.to_path_buf()),
        output_folder: Some(output.to_path_buf()),
        report_name: None,
    }
}

#[test]
fn monotone_set_with_auxiliary_passes() {
    if !gdal_available() {
        eprintln!("GDAL drivers unavailable; skipping");
        return;
    }
    let rasters = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_tier(rasters.path(), "00FVA", vec![10.0, 10.0, 10.0]);
    seed_tier(rasters.path(), "01FVA", vec![11.0, 11.0, 11.0]);
    seed_tier(rasters.path(), "02FVA", vec![12.0, 12.0, 12.0]);
    seed_tier(rasters.path(), "03FVA", vec![13.0, 13.0, 13.0]);
    seed_tier(rasters.path(), "0_2PCT", vec![10.0, 10.0, 10.0]);

    let summary = run(&options(rasters.path(), output.path())).unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert!(!summary.stage_error);
    assert_eq!(summary.outcomes.len(), 4);
    assert!(summary
        .outcomes
        .iter()
        .all(|o| o.extent.is_pass() && o.cell_value.is_pass()));

    let csv = fs::read_to_string(&summary.report_path).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.contains("FVA0 Raster properties"));
    assert!(header.contains("0.2PCT Raster properties"));
    assert!(csv.contains("Pixel_Type,R4,Float64"));
    assert!(csv.contains("Cell_Size,R6,10"));

    // point artifacts are written even for a clean run
    assert!(summary.shapefiles_folder.join("cellDiff1_0_pts.shp").exists());
    assert!(summary.shapefiles_folder.join("cellDiff0_02_pts.shp").exists());
    assert!(summary.log_path.exists());
}

#[test]
fn extent_and_cell_violations_exit_one_with_evidence() {
    if !gdal_available() {
        eprintln!("GDAL drivers unavailable; skipping");
        return;
    }
    let rasters = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    // tier 1 is missing a cell inside tier 0's footprint, and merely equals
    // tier 0 in its last cell
    seed_tier(rasters.path(), "00FVA", vec![10.0, 10.0, 10.0]);
    seed_tier(rasters.path(), "01FVA", vec![11.0, NODATA, 10.0]);
    seed_tier(rasters.path(), "02FVA", vec![12.0, 12.0, 11.0]);
    seed_tier(rasters.path(), "03FVA", vec![13.0, 13.0, 12.0]);

    let summary = run(&options(rasters.path(), output.path())).unwrap();

    assert_eq!(summary.exit_code(), 1);
    assert!(!summary.stage_error);

    let first = &summary.outcomes[0];
    assert!(first.extent.is_violation());
    assert_eq!(first.extent.violation_count(), Some(1));
    assert!(first.cell_value.is_violation());
    assert!(summary.shapefiles_folder.join("diffFva0_1.shp").exists());

    let csv = fs::read_to_string(&summary.report_path).unwrap();
    let extent_line = csv
        .lines()
        .find(|l| l.starts_with("Extent_Compare"))
        .unwrap();
    assert!(extent_line.contains("Fail!"));
    let cell_line = csv
        .lines()
        .find(|l| l.starts_with("Cell_Value_Compare"))
        .unwrap();
    assert!(cell_line.contains("Warning!"));
}

#[test]
fn run_without_auxiliary_reports_four_columns() {
    if !gdal_available() {
        eprintln!("GDAL drivers unavailable; skipping");
        return;
    }
    let rasters = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_tier(rasters.path(), "00FVA", vec![10.0, 10.0]);
    seed_tier(rasters.path(), "01FVA", vec![11.0, 11.0]);
    seed_tier(rasters.path(), "02FVA", vec![12.0, 12.0]);
    seed_tier(rasters.path(), "03FVA", vec![13.0, 13.0]);

    let summary = run(&options(rasters.path(), output.path())).unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.outcomes.len(), 3);

    let csv = fs::read_to_string(&summary.report_path).unwrap();
    let header = csv.lines().next().unwrap();
    assert_eq!(header.split(',').count(), 6);
    assert!(!header.contains("0.2PCT"));
}

#[test]
fn unreadable_raster_degrades_to_skipped_statuses_and_exit_two() {
    if !gdal_available() {
        eprintln!("GDAL drivers unavailable; skipping");
        return;
    }
    let rasters = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_tier(rasters.path(), "00FVA", vec![10.0, 10.0]);
    seed_tier(rasters.path(), "02FVA", vec![12.0, 12.0]);
    seed_tier(rasters.path(), "03FVA", vec![13.0, 13.0]);
    // resolves by token but is not a raster
    fs::write(
        rasters.path().join("Anytown_C_1234_01FVA_Riverine_01.tif"),
        b"not a raster",
    )
    .unwrap();

    let summary = run(&options(rasters.path(), output.path())).unwrap();

    assert!(summary.stage_error);
    assert_eq!(summary.exit_code(), 2);
    // both pairs involving tier 1 are skipped, the third still evaluates
    assert!(summary.outcomes[0].extent.is_skipped());
    assert!(summary.outcomes[0].cell_value.is_skipped());
    assert!(summary.outcomes[1].extent.is_skipped());
    assert!(summary.outcomes[2].extent.is_pass());

    // the report and log still materialize, with the skip reason visible
    let csv = fs::read_to_string(&summary.report_path).unwrap();
    assert!(csv.contains("Skipped"));
    assert!(csv.contains("01FVA failed to load"));
    assert!(summary.log_path.exists());
}

#[test]
fn rerun_into_the_same_output_tree_is_idempotent() {
    if !gdal_available() {
        eprintln!("GDAL drivers unavailable; skipping");
        return;
    }
    let rasters = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_tier(rasters.path(), "00FVA", vec![10.0, 10.0, 10.0]);
    seed_tier(rasters.path(), "01FVA", vec![11.0, NODATA, 11.0]);
    seed_tier(rasters.path(), "02FVA", vec![12.0, 12.0, 12.0]);
    seed_tier(rasters.path(), "03FVA", vec![13.0, 13.0, 13.0]);

    let opts = options(rasters.path(), output.path());
    let first = run(&opts).unwrap();
    let second = run(&opts).unwrap();

    assert_eq!(first.exit_code(), second.exit_code());
    assert!(!second.stage_error);
    for (a, b) in first.outcomes.iter().zip(&second.outcomes) {
        assert_eq!(a.extent.is_violation(), b.extent.is_violation());
        assert_eq!(a.extent.violation_count(), b.extent.violation_count());
        assert_eq!(a.cell_value.violation_count(), b.cell_value.violation_count());
    }
    // the report never clobbers an earlier one
    assert_ne!(first.report_path, second.report_path);
    assert!(second
        .report_path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_1.csv"));
}

#[test]
fn duplicate_tier_token_aborts_before_any_comparison() {
    if !gdal_available() {
        eprintln!("GDAL drivers unavailable; skipping");
        return;
    }
    let rasters = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_tier(rasters.path(), "00FVA", vec![10.0]);
    seed_tier(rasters.path(), "01FVA", vec![11.0]);
    seed_tier(rasters.path(), "02FVA", vec![12.0]);
    seed_tier(rasters.path(), "03FVA", vec![13.0]);
    write_tif(
        &rasters.path().join("Othertown_C_9_01FVA_Coastal_02.tif"),
        1,
        1,
        vec![11.0],
    );

    let err = run(&options(rasters.path(), output.path())).unwrap_err();
    assert!(matches!(err, QcError::DuplicateRaster { token: "01FVA", .. }));
}
