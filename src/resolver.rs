use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{QcError, Result};
use crate::tier::{ComparisonPair, Tier};

/// Where the five input rasters come from.
///
/// The two historical interfaces (explicit per-raster paths, and a folder
/// scanned by filename token) are collapsed into one resolver with a
/// configurable acquisition strategy.
#[derive(Debug, Clone)]
pub enum RasterInput {
    /// Scan a folder for `*.tif` files carrying the tier tokens.
    Folder(PathBuf),
    /// Explicit paths; the auxiliary raster stays optional.
    Explicit {
        fva0: PathBuf,
        fva1: PathBuf,
        fva2: PathBuf,
        fva3: PathBuf,
        pct02: Option<PathBuf>,
    },
}

/// The resolved raster set: four mandatory freeboard rasters, the optional
/// auxiliary raster, and the naming prefix / study-type code parsed from the
/// tier-0 filename (used for report labeling only).
#[derive(Debug, Clone)]
pub struct RasterSet {
    pub freeboard: [PathBuf; 4],
    pub pct02: Option<PathBuf>,
    pub prefix: String,
    pub study_type: String,
}

impl RasterSet {
    pub fn path(&self, tier: Tier) -> Option<&Path> {
        match tier {
            Tier::Fva0 => Some(&self.freeboard[0]),
            Tier::Fva1 => Some(&self.freeboard[1]),
            Tier::Fva2 => Some(&self.freeboard[2]),
            Tier::Fva3 => Some(&self.freeboard[3]),
            Tier::Pct02 => self.pct02.as_deref(),
        }
    }

    /// Resolved tiers in report order.
    pub fn tiers(&self) -> Vec<Tier> {
        let mut tiers = Tier::FREEBOARD.to_vec();
        if self.pct02.is_some() {
            tiers.push(Tier::Pct02);
        }
        tiers
    }

    /// The comparison pairs to evaluate: the three adjacent freeboard pairs,
    /// plus the auxiliary pair when PCT02 was resolved.
    pub fn pairs(&self) -> Vec<ComparisonPair> {
        let mut pairs = ComparisonPair::adjacent().to_vec();
        if self.pct02.is_some() {
            pairs.push(ComparisonPair::auxiliary());
        }
        pairs
    }
}

/// Resolve the raster set. Pure filename matching; no raster is opened.
pub fn resolve(input: &RasterInput) -> Result<RasterSet> {
    match input {
        RasterInput::Folder(dir) => resolve_folder(dir),
        RasterInput::Explicit { fva0, fva1, fva2, fva3, pct02 } => {
            let (prefix, study_type) = parse_tier0_name(fva0)?;
            Ok(RasterSet {
                freeboard: [fva0.clone(), fva1.clone(), fva2.clone(), fva3.clone()],
                pct02: pct02.clone(),
                prefix,
                study_type,
            })
        }
    }
}

fn resolve_folder(dir: &Path) -> Result<RasterSet> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("tif"))
        })
        .collect();
    entries.sort();

    let mut detected: [Option<PathBuf>; 5] = Default::default();
    for path in &entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        for (slot, tier) in Tier::ALL.iter().enumerate() {
            if name.contains(tier.token()) {
                match &detected[slot] {
                    None => detected[slot] = Some(path.clone()),
                    Some(first) => {
                        return Err(QcError::DuplicateRaster {
                            token: tier.token(),
                            first: first.clone(),
                            second: path.clone(),
                        })
                    }
                }
            }
        }
    }

    let mut freeboard = Vec::with_capacity(4);
    for (slot, tier) in Tier::FREEBOARD.iter().enumerate() {
        match detected[slot].take() {
            Some(path) => freeboard.push(path),
            None => return Err(QcError::MissingRaster(tier.token())),
        }
    }
    let pct02 = detected[4].take();

    match &pct02 {
        Some(_) => info!("all 5 rasters including the 0_2PCT tif were resolved"),
        None => info!("4 rasters resolved; 0_2PCT checks will be skipped"),
    }

    let freeboard: [PathBuf; 4] = freeboard
        .try_into()
        .map_err(|_| QcError::MissingRaster("00FVA"))?;
    let (prefix, study_type) = parse_tier0_name(&freeboard[0])?;
    Ok(RasterSet { freeboard, pct02, prefix, study_type })
}

/// Parse the report prefix and study-type code out of the tier-0 filename.
///
/// Splitting on `_` and `.`, the prefix is the first part and the study type
/// is the last three characters of the third-from-last part, e.g.
/// `Anytown_C_1234_00FVA_Riverine_01.tif` -> (`Anytown`, `ine`).
fn parse_tier0_name(path: &Path) -> Result<(String, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| QcError::InvalidRasterName(path.display().to_string()))?;
    let parts: Vec<&str> = name.split(['_', '.']).collect();
    if parts.len() < 5 {
        return Err(QcError::InvalidRasterName(name.to_string()));
    }
    let prefix = parts[0].to_string();
    let study_part = parts[parts.len() - 3];
    let study_type = study_part
        .chars()
        .rev()
        .take(3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    Ok((prefix, study_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn seed_standard(dir: &Path) {
        touch(dir, "Anytown_C_1234_00FVA_Riverine_01.tif");
        touch(dir, "Anytown_C_1234_01FVA_Riverine_01.tif");
        touch(dir, "Anytown_C_1234_02FVA_Riverine_01.tif");
        touch(dir, "Anytown_C_1234_03FVA_Riverine_01.tif");
    }

    #[test]
    fn resolves_four_mandatory_rasters() {
        let dir = TempDir::new().unwrap();
        seed_standard(dir.path());

        let set = resolve(&RasterInput::Folder(dir.path().to_path_buf())).unwrap();
        assert!(set.pct02.is_none());
        assert_eq!(set.prefix, "Anytown");
        // third-from-last part of the tier-0 name, last three characters
        assert_eq!(set.study_type, "ine");
        assert_eq!(set.pairs().len(), 3);
        assert_eq!(set.tiers().len(), 4);
    }

    #[test]
    fn resolves_auxiliary_raster_when_present() {
        let dir = TempDir::new().unwrap();
        seed_standard(dir.path());
        touch(dir.path(), "Anytown_C_1234_0_2PCT_Riv01.tif");

        let set = resolve(&RasterInput::Folder(dir.path().to_path_buf())).unwrap();
        assert!(set.pct02.is_some());
        assert_eq!(set.pairs().len(), 4);
        assert!(set.pairs()[3].is_auxiliary());
    }

    #[test]
    fn duplicate_token_is_fatal() {
        let dir = TempDir::new().unwrap();
        seed_standard(dir.path());
        touch(dir.path(), "Othertown_C_9999_01FVA_Riv01.tif");

        let err = resolve(&RasterInput::Folder(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, QcError::DuplicateRaster { token: "01FVA", .. }));
    }

    #[test]
    fn missing_mandatory_raster_is_fatal() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Anytown_C_1234_00FVA_Riv01.tif");
        touch(dir.path(), "Anytown_C_1234_01FVA_Riv01.tif");

        let err = resolve(&RasterInput::Folder(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, QcError::MissingRaster("02FVA")));
    }

    #[test]
    fn non_tif_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        seed_standard(dir.path());
        touch(dir.path(), "Anytown_C_1234_01FVA_Riv01.tif.xml");
        touch(dir.path(), "notes_00FVA.txt");

        assert!(resolve(&RasterInput::Folder(dir.path().to_path_buf())).is_ok());
    }

    #[test]
    fn short_tier0_name_is_invalid() {
        let err = parse_tier0_name(Path::new("00FVA.tif")).unwrap_err();
        assert!(matches!(err, QcError::InvalidRasterName(_)));
    }
}
