use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::gis::RasterProperties;
use crate::status::ComparisonStatus;
use crate::tier::Tier;

/// One report column: a raster's checklist metadata plus the statuses of the
/// comparison in which it participates as the higher member (FVA0 carries the
/// auxiliary pair when PCT02 is present).
#[derive(Debug, Clone)]
pub struct ReportColumn {
    pub tier: Tier,
    /// `None` when the metadata stage failed for this raster.
    pub properties: Option<RasterProperties>,
    pub compared_against: Option<String>,
    pub extent: Option<ComparisonStatus>,
    pub cell_value: Option<ComparisonStatus>,
}

/// The assembled QC report: one column per resolved raster, in tier order.
#[derive(Debug, Clone)]
pub struct QcReport {
    pub columns: Vec<ReportColumn>,
}

impl QcReport {
    pub fn to_csv(&self) -> String {
        let mut out = String::new();

        let mut header = vec!["AttributeName".to_string(), "QC checklist item".to_string()];
        header.extend(self.columns.iter().map(|c| c.tier.column_title().to_string()));
        push_row(&mut out, &header);

        self.property_row(&mut out, "Name", "R3", |p| p.name.clone());
        self.property_row(&mut out, "Pixel_Type", "R4", |p| p.pixel_type.clone());
        self.property_row(&mut out, "Cell_Size", "R6", |p| format_cell_size(p.cell_size));
        self.property_row(&mut out, "Spatial_Reference", "R7", |p| {
            p.spatial_reference.clone()
        });
        self.property_row(&mut out, "Vertical_Datum", "R8", |p| p.vertical_datum.clone());
        self.property_row(&mut out, "Vertical_Unit", "R8", |p| p.vertical_unit.clone());

        // spacer between the metadata block and the comparison block
        push_row(&mut out, &vec![String::new(); self.columns.len() + 2]);

        self.status_row(&mut out, "Compared_Against", "", |c| {
            c.compared_against.clone().unwrap_or_default()
        });
        self.status_row(&mut out, "Extent_Compare", "R11", |c| {
            c.extent.as_ref().map(|s| s.report_text()).unwrap_or_default()
        });
        self.status_row(&mut out, "Cell_Value_Compare", "R14", |c| {
            c.cell_value.as_ref().map(|s| s.report_text()).unwrap_or_default()
        });

        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_csv())?;
        Ok(())
    }

    fn property_row<F>(&self, out: &mut String, label: &str, qc_item: &str, value: F)
    where
        F: Fn(&RasterProperties) -> String,
    {
        let mut row = vec![label.to_string(), qc_item.to_string()];
        row.extend(self.columns.iter().map(|c| match &c.properties {
            Some(props) => value(props),
            None => "Skipped".to_string(),
        }));
        push_row(out, &row);
    }

    fn status_row<F>(&self, out: &mut String, label: &str, qc_item: &str, value: F)
    where
        F: Fn(&ReportColumn) -> String,
    {
        let mut row = vec![label.to_string(), qc_item.to_string()];
        row.extend(self.columns.iter().map(value));
        push_row(out, &row);
    }
}

fn push_row(out: &mut String, fields: &[String]) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        out.push_str(&csv_field(field));
        first = false;
    }
    out.push('\n');
}

/// Minimal CSV quoting: fields containing a comma, quote or newline are
/// wrapped and inner quotes doubled.
fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_cell_size(size: f64) -> String {
    // trims trailing zeros without scientific notation; size is pre-rounded
    let mut s = format!("{size:.5}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// First non-existing `<base>_<n><ext>` variant of the requested filename, so
/// reruns never clobber an earlier report.
pub fn unique_output_path(folder: &Path, filename: &str) -> PathBuf {
    let candidate = folder.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (base, ext) = match filename.rfind('.') {
        Some(dot) => (&filename[..dot], &filename[dot..]),
        None => (filename, ""),
    };
    let mut index = 1;
    loop {
        let candidate = folder.join(format!("{base}_{index}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn props(name: &str) -> RasterProperties {
        RasterProperties {
            name: name.to_string(),
            pixel_type: "Float32".to_string(),
            cell_size: 10.0,
            spatial_reference: "NAD83 / UTM zone 15N".to_string(),
            vertical_datum: "NAVD88 height".to_string(),
            vertical_unit: "US survey foot".to_string(),
        }
    }

    fn column(tier: Tier, pair_label: Option<&str>) -> ReportColumn {
        ReportColumn {
            tier,
            properties: Some(props(&format!("{}_{}.tif", "Anytown", tier.token()))),
            compared_against: pair_label.map(str::to_string),
            extent: pair_label.map(|_| ComparisonStatus::Pass),
            cell_value: pair_label.map(|_| ComparisonStatus::Pass),
        }
    }

    #[test]
    fn csv_has_one_column_per_raster_plus_labels() {
        let report = QcReport {
            columns: vec![
                column(Tier::Fva0, None),
                column(Tier::Fva1, Some("01FVA vs 00FVA")),
                column(Tier::Fva2, Some("02FVA vs 01FVA")),
                column(Tier::Fva3, Some("03FVA vs 02FVA")),
            ],
        };
        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with("AttributeName,QC checklist item,FVA0"));
        assert_eq!(lines[0].split(',').count(), 6);
        assert!(lines[1].starts_with("Name,R3,"));
        assert!(lines[8].starts_with("Compared_Against,,"));
        assert!(lines[9].starts_with("Extent_Compare,R11,"));
        assert!(lines[10].starts_with("Cell_Value_Compare,R14,"));
        // no PCT02 column without the auxiliary raster
        assert!(!csv.contains("0.2PCT"));
    }

    #[test]
    fn failing_status_lands_in_the_higher_members_column() {
        let mut fva1 = column(Tier::Fva1, Some("01FVA vs 00FVA"));
        fva1.extent = Some(ComparisonStatus::extent(3, PathBuf::from("diffFva0_1.shp")));
        let report = QcReport { columns: vec![column(Tier::Fva0, None), fva1] };
        let csv = report.to_csv();
        let extent_line = csv
            .lines()
            .find(|l| l.starts_with("Extent_Compare"))
            .unwrap();
        assert!(extent_line.contains("Fail! See diffFva0_1.shp for details."));
    }

    #[test]
    fn skipped_metadata_is_reported_not_blank() {
        let mut col = column(Tier::Fva0, None);
        col.properties = None;
        let report = QcReport { columns: vec![col] };
        assert!(report.to_csv().contains("Name,R3,Skipped"));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let mut col = column(Tier::Fva0, None);
        if let Some(p) = col.properties.as_mut() {
            p.spatial_reference = "NAD83(2011) / Texas, Central".to_string();
        }
        let report = QcReport { columns: vec![col] };
        assert!(report
            .to_csv()
            .contains("\"NAD83(2011) / Texas, Central\""));
    }

    #[test]
    fn cell_size_formats_without_trailing_zeros() {
        assert_eq!(format_cell_size(10.0), "10");
        assert_eq!(format_cell_size(0.00003), "0.00003");
        assert_eq!(format_cell_size(3.04801), "3.04801");
    }

    #[test]
    fn unique_output_path_suffixes_existing_names() {
        let dir = TempDir::new().unwrap();
        let name = "Anytown_ine_Raster_QC_Results.csv";
        assert_eq!(unique_output_path(dir.path(), name), dir.path().join(name));

        fs::write(dir.path().join(name), b"x").unwrap();
        assert_eq!(
            unique_output_path(dir.path(), name),
            dir.path().join("Anytown_ine_Raster_QC_Results_1.csv")
        );
    }
}
