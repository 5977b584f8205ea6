use tracing::debug;

use crate::error::Result;
use crate::grid::{interior_point, AlignedPair, Grid};
use crate::remap::RemapRange;
use crate::tier::ComparisonPair;

/// A representative interior point of one cell-level violation region,
/// carrying both rasters' sampled values and their signed difference.
///
/// Violation cells are defined in both inputs, so samples are normally
/// present; an unresolvable sample leaves `value_diff` unset and the
/// shapefile field null.
#[derive(Debug, Clone)]
pub struct ViolationPoint {
    pub x: f64,
    pub y: f64,
    pub lower_value: Option<f64>,
    pub higher_value: Option<f64>,
    pub value_diff: Option<f64>,
}

/// Raw output of the cell value comparator for one pair.
#[derive(Debug, Clone)]
pub struct CellValueComparison {
    pub pair: ComparisonPair,
    /// One point per single-part violation region; empty is a valid result
    /// and still becomes a queryable (zero-record) artifact downstream.
    pub points: Vec<ViolationPoint>,
    /// Total violating cells, before region reduction.
    pub violation_cells: usize,
}

/// Compare cell values of a pair over the union of both extents.
///
/// The difference is `higher - lower` for freeboard pairs and
/// `PCT02 - FVA0` for the auxiliary pair. A cell defined in only one input
/// has no delta and is never classified: footprint mismatches are the extent
/// comparator's finding, not a cell value violation. The pair's remap scheme
/// turns deltas into violation/acceptable classes; violating regions reduce
/// to interior points.
pub fn compare_cell_values(
    pair: ComparisonPair,
    lower: &Grid,
    higher: &Grid,
) -> Result<CellValueComparison> {
    let aligned = AlignedPair::new(lower, higher)?;
    let remap = if pair.is_auxiliary() {
        RemapRange::percent_chance()
    } else {
        RemapRange::freeboard()
    };

    let mask = aligned.mask(|lo, hi| match (lo, hi) {
        (Some(l), Some(h)) => remap.is_violation(pair.delta(l, h)),
        _ => false,
    });
    let violation_cells = mask.count();

    let points = mask
        .components()
        .iter()
        .map(|comp| {
            let (x, y) = interior_point(comp, &mask.transform);
            let lower_value = lower.sample(x, y);
            let higher_value = higher.sample(x, y);
            let value_diff = match (lower_value, higher_value) {
                (Some(l), Some(h)) => Some(pair.delta(l, h)),
                _ => None,
            };
            ViolationPoint { x, y, lower_value, higher_value, value_diff }
        })
        .collect::<Vec<_>>();

    debug!(
        pair = %pair.label(),
        violation_cells,
        points = points.len(),
        "cell value comparison computed"
    );

    Ok(CellValueComparison { pair, points, violation_cells })
}
