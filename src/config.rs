use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{QcError, Result};
use crate::resolver::RasterInput;

/// TOML run configuration, the file-based alternative to CLI flags.
///
/// Either `rasters_folder` or the explicit `[rasters]` table selects the
/// input; when both are present the explicit paths win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QcConfig {
    pub rasters_folder: Option<PathBuf>,
    pub rasters: Option<ExplicitRasters>,
    pub output_folder: Option<PathBuf>,
    pub report_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplicitRasters {
    pub fva0: PathBuf,
    pub fva1: PathBuf,
    pub fva2: PathBuf,
    pub fva3: PathBuf,
    pub pct02: Option<PathBuf>,
}

impl QcConfig {
    pub fn from_file(path: &Path) -> Result<QcConfig> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| QcError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn raster_input(&self) -> Result<RasterInput> {
        if let Some(rasters) = &self.rasters {
            return Ok(RasterInput::Explicit {
                fva0: rasters.fva0.clone(),
                fva1: rasters.fva1.clone(),
                fva2: rasters.fva2.clone(),
                fva3: rasters.fva3.clone(),
                pct02: rasters.pct02.clone(),
            });
        }
        if let Some(folder) = &self.rasters_folder {
            return Ok(RasterInput::Folder(folder.clone()));
        }
        Err(QcError::NoInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_config_parses() {
        let cfg: QcConfig = toml::from_str(
            r#"
            rasters_folder = "/data/anytown"
            output_folder = "/data/out"
            "#,
        )
        .unwrap();
        assert!(matches!(cfg.raster_input().unwrap(), RasterInput::Folder(_)));
        assert_eq!(cfg.output_folder.as_deref(), Some(Path::new("/data/out")));
    }

    #[test]
    fn explicit_rasters_take_precedence_over_folder() {
        let cfg: QcConfig = toml::from_str(
            r#"
            rasters_folder = "/data/anytown"

            [rasters]
            fva0 = "a_00FVA.tif"
            fva1 = "a_01FVA.tif"
            fva2 = "a_02FVA.tif"
            fva3 = "a_03FVA.tif"
            "#,
        )
        .unwrap();
        match cfg.raster_input().unwrap() {
            RasterInput::Explicit { pct02, .. } => assert!(pct02.is_none()),
            other => panic!("expected explicit input, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_has_no_input() {
        let cfg = QcConfig::default();
        assert!(matches!(cfg.raster_input(), Err(QcError::NoInput)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: std::result::Result<QcConfig, _> = toml::from_str("raster_dir = \"/x\"");
        assert!(parsed.is_err());
    }
}
