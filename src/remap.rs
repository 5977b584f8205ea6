//! Range-based reclassification of cell value differences.
//!
//! Bands are lower-inclusive, upper-exclusive (`[lo, hi)`), matching the remap
//! semantics of the geoprocessing checklist this tool automates. Values that
//! fall outside every band classify to `None` and are ignored, like NoData.

/// Class assigned to cells that violate the monotonicity invariant.
pub const VIOLATION: i32 = 1;

/// Class assigned to cells inside the acceptable tolerance band.
pub const ACCEPTABLE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    lo: f64,
    hi: f64,
    class: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemapRange {
    bands: Vec<Band>,
}

impl RemapRange {
    pub fn new(bands: &[(f64, f64, i32)]) -> Self {
        RemapRange {
            bands: bands
                .iter()
                .map(|&(lo, hi, class)| Band { lo, hi, class })
                .collect(),
        }
    }

    /// Remap applied to adjacent freeboard pairs.
    ///
    /// The acceptable band `[0.95, 1.05)` is centered near a delta of one, not
    /// zero: adjacent freeboard tiers differ by one vertical unit, so a higher
    /// tier that merely equals the lower one (delta 0) is a violation. The
    /// thresholds are carried over literally from the QC checklist.
    pub fn freeboard() -> Self {
        Self::new(&[
            (-1.0, 0.95, VIOLATION),
            (0.95, 1.05, ACCEPTABLE),
            (1.05, 10.0, VIOLATION),
        ])
    }

    /// Remap applied to the auxiliary pair (PCT02 - FVA0).
    ///
    /// Collapses to a sign test at zero: the auxiliary raster must meet or
    /// exceed tier 0 everywhere.
    pub fn percent_chance() -> Self {
        Self::new(&[(-10.0, 0.0, VIOLATION), (0.0, 10.0, ACCEPTABLE)])
    }

    /// Classify a value into the first band containing it.
    pub fn classify(&self, value: f64) -> Option<i32> {
        self.bands
            .iter()
            .find(|b| value >= b.lo && value < b.hi)
            .map(|b| b.class)
    }

    /// True when the value classifies as a violation.
    pub fn is_violation(&self, value: f64) -> bool {
        self.classify(value) == Some(VIOLATION)
    }
}
