//! Automated QC checklist for FFRMS freeboard raster sets.
//!
//! A raster set is the four freeboard tiers (FVA0 through FVA3) plus an
//! optional 0.2%-annual-chance raster. The checklist verifies that each
//! higher tier covers the one below it (extent) and sits one vertical unit
//! above it (cell value), records per-raster metadata, and emits a CSV
//! report, a run log and shapefile evidence for every violation.

pub mod cellvalue;
pub mod config;
pub mod error;
pub mod extent;
pub mod gis;
pub mod grid;
pub mod pipeline;
pub mod remap;
pub mod report;
pub mod resolver;
pub mod runlog;
pub mod status;
pub mod tier;

pub use config::QcConfig;
pub use error::{QcError, Result};
pub use pipeline::{run, PipelineOptions, RunSummary};
pub use resolver::{resolve, RasterInput, RasterSet};
pub use status::ComparisonStatus;
pub use tier::{ComparisonPair, Tier};
