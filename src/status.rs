use std::path::PathBuf;

/// Terminal outcome of one comparison for one pair.
///
/// `Fail` and `Warning` are validation results, not errors: they are the
/// tool's correct output when input rasters violate the monotonicity
/// invariant. `Skipped` records that a stage error upstream prevented the
/// comparison from producing a result.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonStatus {
    Pass,
    Fail { evidence: PathBuf, count: u64 },
    Warning { evidence: PathBuf, count: u64 },
    Skipped { reason: String },
}

impl ComparisonStatus {
    /// Extent comparisons fail hard when the failure-direction difference has
    /// any features.
    pub fn extent(count: u64, evidence: PathBuf) -> Self {
        if count > 0 {
            ComparisonStatus::Fail { evidence, count }
        } else {
            ComparisonStatus::Pass
        }
    }

    /// Cell value comparisons downgrade to a warning with the violation point
    /// count as supporting detail.
    pub fn cell_value(count: u64, evidence: PathBuf) -> Self {
        if count > 0 {
            ComparisonStatus::Warning { evidence, count }
        } else {
            ComparisonStatus::Pass
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        ComparisonStatus::Skipped { reason: reason.into() }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ComparisonStatus::Pass)
    }

    /// True for Fail or Warning.
    pub fn is_violation(&self) -> bool {
        matches!(self, ComparisonStatus::Fail { .. } | ComparisonStatus::Warning { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ComparisonStatus::Skipped { .. })
    }

    pub fn violation_count(&self) -> Option<u64> {
        match self {
            ComparisonStatus::Fail { count, .. } | ComparisonStatus::Warning { count, .. } => {
                Some(*count)
            }
            _ => None,
        }
    }

    /// Free-text cell value for the CSV report.
    pub fn report_text(&self) -> String {
        match self {
            ComparisonStatus::Pass => "Pass".to_string(),
            ComparisonStatus::Fail { evidence, .. } => {
                format!("Fail! See {} for details.", evidence.display())
            }
            ComparisonStatus::Warning { evidence, .. } => {
                format!("Warning! See {} for details.", evidence.display())
            }
            ComparisonStatus::Skipped { reason } => format!("Skipped: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_status_fails_on_any_feature() {
        let status = ComparisonStatus::extent(2, PathBuf::from("diffFva0_1.shp"));
        assert!(status.is_violation());
        assert_eq!(status.violation_count(), Some(2));
        assert!(ComparisonStatus::extent(0, PathBuf::from("x.shp")).is_pass());
    }

    #[test]
    fn cell_value_status_warns_on_any_point() {
        let status = ComparisonStatus::cell_value(1, PathBuf::from("cellDiff1_0_pts.shp"));
        assert!(matches!(status, ComparisonStatus::Warning { count: 1, .. }));
        assert!(ComparisonStatus::cell_value(0, PathBuf::from("x.shp")).is_pass());
    }

    #[test]
    fn report_text_carries_the_evidence_pointer() {
        let status = ComparisonStatus::extent(1, PathBuf::from("out/diffFva1_2.shp"));
        let text = status.report_text();
        assert!(text.starts_with("Fail!"));
        assert!(text.contains("diffFva1_2.shp"));

        let skipped = ComparisonStatus::skipped("upstream raster failed to load");
        assert_eq!(skipped.report_text(), "Skipped: upstream raster failed to load");
    }
}
