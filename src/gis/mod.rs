//! GDAL-backed raster and vector I/O: the seam to the external geospatial
//! engine. Everything that touches a dataset or driver lives here; the
//! comparators themselves stay pure.

use std::path::Path;

use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    Defn, Feature, FieldValue, Geometry, LayerAccess, LayerOptions, OGRFieldType,
    OGRwkbGeometryType,
};
use gdal::{Dataset, DriverManager};
use tracing::warn;

use crate::cellvalue::ViolationPoint;
use crate::error::{QcError, Result};
use crate::extent::DiffFeature;
use crate::grid::Grid;
use crate::tier::ComparisonPair;

const RASTER_DRIVER: &str = "GTiff";
const VECTOR_DRIVER: &str = "ESRI Shapefile";

/// Scoped acquisition of the engine's capability. Verifies the required
/// drivers up front so a missing engine surfaces before any comparison runs;
/// every engine-touching call takes the session by reference.
pub struct EngineSession {
    _private: (),
}

impl EngineSession {
    pub fn acquire() -> Result<EngineSession> {
        for name in [RASTER_DRIVER, VECTOR_DRIVER] {
            if DriverManager::get_driver_by_name(name).is_err() {
                return Err(QcError::DriverUnavailable(name));
            }
        }
        Ok(EngineSession { _private: () })
    }
}

/// Read band 1 of a GeoTIFF into an in-memory grid.
pub fn read_grid(_session: &EngineSession, path: &Path) -> Result<Grid> {
    let dataset = Dataset::open(path)?;
    let (cols, rows) = dataset.raster_size();
    let transform = dataset.geo_transform()?;
    if transform[2] != 0.0 || transform[4] != 0.0 {
        return Err(QcError::RotatedRaster(path.to_path_buf()));
    }
    let band = dataset.rasterband(1)?;
    let nodata = band.no_data_value();
    let buffer = band.read_as::<f64>((0, 0), (cols, rows), (cols, rows), None)?;
    Grid::new(cols, rows, transform, nodata, buffer.data().to_vec())
}

/// WKT of a raster's spatial reference, if it has one. Used to stamp the
/// evidence artifacts with the source projection.
pub fn read_srs_wkt(_session: &EngineSession, path: &Path) -> Result<Option<String>> {
    let dataset = Dataset::open(path)?;
    match dataset.spatial_ref() {
        Ok(srs) => Ok(srs.to_wkt().ok()),
        Err(_) => Ok(None),
    }
}

/// Per-raster metadata for the QC checklist report.
#[derive(Debug, Clone)]
pub struct RasterProperties {
    /// QC R3
    pub name: String,
    /// QC R4
    pub pixel_type: String,
    /// QC R6, rounded to 5 decimals
    pub cell_size: f64,
    /// QC R7
    pub spatial_reference: String,
    /// QC R8; `Not Defined` is a valid, reportable state
    pub vertical_datum: String,
    /// QC R8 unit
    pub vertical_unit: String,
}

pub const NOT_DEFINED: &str = "Not Defined";

pub fn read_properties(_session: &EngineSession, path: &Path) -> Result<RasterProperties> {
    let dataset = Dataset::open(path)?;
    let band = dataset.rasterband(1)?;
    let transform = dataset.geo_transform()?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let pixel_type = format!("{:?}", band.band_type());
    let cell_size = (transform[1].abs() * 1e5).round() / 1e5;

    let (spatial_reference, vertical_datum, vertical_unit) = match dataset.spatial_ref() {
        Ok(srs) => {
            let sr_name = srs.name().unwrap_or_else(|_| NOT_DEFINED.to_string());
            let wkt = srs.to_wkt().unwrap_or_default();
            let (vcs, unit) = vertical_crs_from_wkt(&wkt);
            (sr_name, vcs, unit)
        }
        Err(_) => (
            NOT_DEFINED.to_string(),
            NOT_DEFINED.to_string(),
            NOT_DEFINED.to_string(),
        ),
    };

    Ok(RasterProperties {
        name,
        pixel_type,
        cell_size,
        spatial_reference,
        vertical_datum,
        vertical_unit,
    })
}

/// Pull the vertical datum name and linear unit out of a compound-CRS WKT.
/// Handles WKT1 (`VERT_CS`), ESRI (`VERTCS`) and WKT2 (`VERTCRS`) spellings;
/// anything else reports `Not Defined`.
fn vertical_crs_from_wkt(wkt: &str) -> (String, String) {
    let vert_start = ["VERT_CS[", "VERTCS[", "VERTCRS["]
        .iter()
        .filter_map(|key| wkt.find(key))
        .min();
    let Some(start) = vert_start else {
        return (NOT_DEFINED.to_string(), NOT_DEFINED.to_string());
    };

    let rest = &wkt[start..];
    let datum = quoted_value(rest).unwrap_or_else(|| NOT_DEFINED.to_string());
    // "LENGTHUNIT[" (WKT2) contains "UNIT[", so one key covers both spellings
    let unit = rest
        .find("UNIT[")
        .map(|i| &rest[i..])
        .and_then(quoted_value)
        .unwrap_or_else(|| NOT_DEFINED.to_string());
    (datum, unit)
}

/// First double-quoted string in a WKT fragment.
fn quoted_value(fragment: &str) -> Option<String> {
    let open = fragment.find('"')?;
    let rest = &fragment[open + 1..];
    let close = rest.find('"')?;
    Some(rest[..close].to_string())
}

/// Write single-part difference features to a polygon shapefile with an
/// `Area` attribute. Returns the feature count.
pub fn write_polygon_shapefile(
    _session: &EngineSession,
    path: &Path,
    srs_wkt: Option<&str>,
    features: &[DiffFeature],
) -> Result<u64> {
    remove_existing_shapefile(path)?;
    let driver = DriverManager::get_driver_by_name(VECTOR_DRIVER)?;
    let mut dataset = driver.create_vector_only(path)?;
    let srs = srs_wkt.map(SpatialRef::from_wkt).transpose()?;
    let mut layer = dataset.create_layer(LayerOptions {
        name: layer_name(path),
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbPolygon,
        ..Default::default()
    })?;
    layer.create_defn_fields(&[("Area", OGRFieldType::OFTReal)])?;

    for feature in features {
        let mut polygon = Geometry::empty(OGRwkbGeometryType::wkbPolygon)?;
        for ring in &feature.rings {
            let mut linear_ring = Geometry::empty(OGRwkbGeometryType::wkbLinearRing)?;
            for &(x, y) in ring {
                linear_ring.add_point_2d((x, y));
            }
            if let Some(&first) = ring.first() {
                // shapefile rings must be explicitly closed
                linear_ring.add_point_2d(first);
            }
            polygon.add_geometry(linear_ring)?;
        }
        layer.create_feature_fields(
            polygon,
            &["Area"],
            &[FieldValue::RealValue(feature.area)],
        )?;
    }
    Ok(features.len() as u64)
}

/// Write violation points to a point shapefile with both tiers' sampled
/// values and `ValueDiff`. An empty slice still produces a valid zero-record
/// artifact. Returns the point count.
pub fn write_point_shapefile(
    _session: &EngineSession,
    path: &Path,
    srs_wkt: Option<&str>,
    pair: ComparisonPair,
    points: &[ViolationPoint],
) -> Result<u64> {
    remove_existing_shapefile(path)?;
    let driver = DriverManager::get_driver_by_name(VECTOR_DRIVER)?;
    let mut dataset = driver.create_vector_only(path)?;
    let srs = srs_wkt.map(SpatialRef::from_wkt).transpose()?;
    let layer = dataset.create_layer(LayerOptions {
        name: layer_name(path),
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbPoint,
        ..Default::default()
    })?;
    layer.create_defn_fields(&[
        (pair.lower.field_name(), OGRFieldType::OFTReal),
        (pair.higher.field_name(), OGRFieldType::OFTReal),
        ("ValueDiff", OGRFieldType::OFTReal),
    ])?;

    let defn = Defn::from_layer(&layer);
    for point in points {
        let mut feature = Feature::new(&defn)?;
        let mut geometry = Geometry::empty(OGRwkbGeometryType::wkbPoint)?;
        geometry.add_point_2d((point.x, point.y));
        feature.set_geometry(geometry)?;
        if let Some(v) = point.lower_value {
            feature.set_field_double(pair.lower.field_name(), v)?;
        }
        if let Some(v) = point.higher_value {
            feature.set_field_double(pair.higher.field_name(), v)?;
        }
        if let Some(v) = point.value_diff {
            feature.set_field_double("ValueDiff", v)?;
        } else if point.lower_value.is_some() || point.higher_value.is_some() {
            warn!(
                pair = %pair.label(),
                x = point.x,
                y = point.y,
                "violation point is missing a sample; ValueDiff left null"
            );
        }
        feature.create(&layer)?;
    }
    Ok(points.len() as u64)
}

fn layer_name(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("layer")
}

/// The shapefile driver refuses to create over an existing dataset, so reruns
/// into the same output tree clear the sidecar files first.
fn remove_existing_shapefile(path: &Path) -> Result<()> {
    for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
        let sidecar = path.with_extension(ext);
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)?;
        }
    }
    Ok(())
}
