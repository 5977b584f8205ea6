use std::fmt;

/// One of the five logical QC input rasters.
///
/// The four freeboard tiers are totally ordered (`Fva0 < Fva1 < Fva2 < Fva3`).
/// `Pct02` is the auxiliary 0.2%-annual-chance raster; it is optional and is
/// only ever compared against `Fva0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Fva0,
    Fva1,
    Fva2,
    Fva3,
    Pct02,
}

impl Tier {
    pub const FREEBOARD: [Tier; 4] = [Tier::Fva0, Tier::Fva1, Tier::Fva2, Tier::Fva3];
    pub const ALL: [Tier; 5] = [Tier::Fva0, Tier::Fva1, Tier::Fva2, Tier::Fva3, Tier::Pct02];

    /// Filename token used to detect this raster in the input folder.
    pub fn token(self) -> &'static str {
        match self {
            Tier::Fva0 => "00FVA",
            Tier::Fva1 => "01FVA",
            Tier::Fva2 => "02FVA",
            Tier::Fva3 => "03FVA",
            Tier::Pct02 => "0_2PCT",
        }
    }

    /// Attribute column name for sampled values (shapefile DBF limit: 10 chars).
    pub fn field_name(self) -> &'static str {
        self.token()
    }

    /// Column title used in the CSV report header.
    pub fn column_title(self) -> &'static str {
        match self {
            Tier::Fva0 => "FVA0 Raster properties",
            Tier::Fva1 => "FVA1 Raster properties",
            Tier::Fva2 => "FVA2 Raster properties",
            Tier::Fva3 => "FVA3 Raster properties",
            Tier::Pct02 => "0.2PCT Raster properties",
        }
    }

    /// Short digit code used in artifact stems (`diffFva0_1`, `cellDiff1_0_pts`).
    fn digits(self) -> &'static str {
        match self {
            Tier::Fva0 => "0",
            Tier::Fva1 => "1",
            Tier::Fva2 => "2",
            Tier::Fva3 => "3",
            Tier::Pct02 => "02",
        }
    }

    pub fn is_auxiliary(self) -> bool {
        self == Tier::Pct02
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// An ordered (lower, higher) pair of tiers subject to the monotonicity
/// invariant: the higher tier's footprint must cover the lower tier's, and its
/// cell values must dominate the lower tier's within the tolerance band.
///
/// The auxiliary pair `(Pct02, Fva0)` reverses the delta polarity: its
/// difference raster is `PCT02 - FVA0` and a violation is a cell where the
/// auxiliary raster falls below tier 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComparisonPair {
    pub lower: Tier,
    pub higher: Tier,
}

impl ComparisonPair {
    /// The three fixed adjacent freeboard pairs, in tier order.
    pub fn adjacent() -> [ComparisonPair; 3] {
        [
            ComparisonPair { lower: Tier::Fva0, higher: Tier::Fva1 },
            ComparisonPair { lower: Tier::Fva1, higher: Tier::Fva2 },
            ComparisonPair { lower: Tier::Fva2, higher: Tier::Fva3 },
        ]
    }

    /// The conditional auxiliary pair, evaluated only when PCT02 is resolved.
    pub fn auxiliary() -> ComparisonPair {
        ComparisonPair { lower: Tier::Pct02, higher: Tier::Fva0 }
    }

    pub fn is_auxiliary(self) -> bool {
        self.lower.is_auxiliary()
    }

    /// Report label, e.g. `01FVA vs 00FVA`.
    pub fn label(self) -> String {
        format!("{} vs {}", self.higher.token(), self.lower.token())
    }

    /// Signed cell value difference with this pair's polarity applied.
    pub fn delta(self, lower_value: f64, higher_value: f64) -> f64 {
        if self.is_auxiliary() {
            lower_value - higher_value
        } else {
            higher_value - lower_value
        }
    }

    /// Stem of the persisted extent-failure artifact (lower minus higher).
    pub fn extent_fail_stem(self) -> String {
        format!("diffFva{}_{}", self.lower.digits(), self.higher.digits())
    }

    /// Stem of the informational extent artifact (higher minus lower).
    pub fn extent_info_stem(self) -> String {
        format!("diffFva{}_{}", self.higher.digits(), self.lower.digits())
    }

    /// Stem of the violation points artifact.
    pub fn cell_points_stem(self) -> String {
        format!("cellDiff{}_{}_pts", self.higher.digits(), self.lower.digits())
    }

    /// Human-readable description of a cell value violation for this pair.
    pub fn violation_message(self) -> String {
        if self.is_auxiliary() {
            format!(
                "{} has cells lower than those in {}",
                self.lower.token(),
                self.higher.token()
            )
        } else {
            format!(
                "{} has cells lower than those in {}",
                self.higher.token(),
                self.lower.token()
            )
        }
    }
}
