use tracing::debug;

use crate::error::Result;
use crate::grid::{component_rings, rings_area, AlignedPair, Grid, Mask};
use crate::tier::ComparisonPair;

/// One single-part difference feature with its planar area, computed from the
/// feature's own ring geometry.
#[derive(Debug, Clone)]
pub struct DiffFeature {
    /// Closed rings in world coordinates, outer ring first.
    pub rings: Vec<Vec<(f64, f64)>>,
    pub area: f64,
}

/// The one-sided footprint difference in a single direction.
#[derive(Debug, Clone, Default)]
pub struct ExtentDiff {
    pub features: Vec<DiffFeature>,
}

impl ExtentDiff {
    pub fn feature_count(&self) -> u64 {
        self.features.len() as u64
    }

    pub fn total_area(&self) -> f64 {
        self.features.iter().map(|f| f.area).sum()
    }

    fn from_mask(mask: &Mask) -> ExtentDiff {
        let features = mask
            .components()
            .iter()
            .map(|comp| {
                let rings = component_rings(comp, &mask.transform);
                let area = rings_area(&rings);
                DiffFeature { rings, area }
            })
            .collect();
        ExtentDiff { features }
    }
}

/// Raw output of the extent comparator for one pair.
#[derive(Debug, Clone)]
pub struct ExtentComparison {
    pub pair: ComparisonPair,
    /// `footprint(lower) - footprint(higher)`: the failure indicator. For the
    /// auxiliary pair this is the region of PCT02's footprint outside FVA0's.
    pub reverse: ExtentDiff,
    /// `footprint(higher) - footprint(lower)`: persisted as a secondary
    /// artifact, never a failure condition.
    pub forward: ExtentDiff,
}

/// Compare the footprints of a pair. Any defined (non-nodata) cell counts as
/// in-extent; sub-cell precision is lost by design.
pub fn compare_extent(
    pair: ComparisonPair,
    lower: &Grid,
    higher: &Grid,
) -> Result<ExtentComparison> {
    let aligned = AlignedPair::new(lower, higher)?;

    let reverse_mask = aligned.mask(|lo, hi| lo.is_some() && hi.is_none());
    let forward_mask = aligned.mask(|lo, hi| hi.is_some() && lo.is_none());

    let reverse = ExtentDiff::from_mask(&reverse_mask);
    let forward = ExtentDiff::from_mask(&forward_mask);

    debug!(
        pair = %pair.label(),
        reverse_features = reverse.feature_count(),
        forward_features = forward.feature_count(),
        "extent comparison computed"
    );

    Ok(ExtentComparison { pair, reverse, forward })
}
