use crate::raster::RasterLayer;
use crate::sites::SamplePoint;
use std::fmt;
use std::fs;
use std::path::Path;

/// Token written for a site that falls outside a layer's coverage. The
/// table is consumed by R-side statistics, which read this natively.
const MISSING_VALUE: &str = "NA";

/// Covariate values for one site, one entry per layer in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub site: String,
    pub values: Vec<Option<f32>>,
}

/// The joined site x variable table, ready for export. Row order equals the
/// site table's input order.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateTable {
    pub variables: Vec<String>,
    pub records: Vec<ExtractedRecord>,
}

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Csv(e) => write!(f, "Failed to serialize covariate table: {}", e),
            ExportError::Io(e) => write!(f, "Failed to write covariate table: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> ExportError {
        ExportError::Csv(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> ExportError {
        ExportError::Io(err)
    }
}

/// Sample every layer at every site, nearest-cell. A site outside a layer's
/// coverage gets a missing value for that column; the row is still emitted.
pub fn extract_covariates(sites: &[SamplePoint], layers: &[RasterLayer]) -> CovariateTable {
    let variables = layers.iter().map(|l| l.name().to_string()).collect();

    let records = sites
        .iter()
        .map(|point| ExtractedRecord {
            site: point.site.clone(),
            values: layers
                .iter()
                .map(|layer| layer.value_at(point.lon, point.lat))
                .collect(),
        })
        .collect();

    CovariateTable { variables, records }
}

impl CovariateTable {
    pub fn missing_count(&self) -> usize {
        self.records
            .iter()
            .flat_map(|r| &r.values)
            .filter(|v| v.is_none())
            .count()
    }

    /// Serialize the whole table in memory, then write it in one call so a
    /// failed run leaves no partial file. Overwrites an existing file.
    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["site".to_string()];
        header.extend(self.variables.iter().cloned());
        writer.write_record(&header)?;

        for record in &self.records {
            let mut row = vec![record.site.clone()];
            row.extend(record.values.iter().map(|value| match value {
                Some(v) => v.to_string(),
                None => MISSING_VALUE.to_string(),
            }));
            writer.write_record(&row)?;
        }

        let buffer = writer
            .into_inner()
            .map_err(|e| ExportError::Io(std::io::Error::other(e.to_string())))?;

        fs::write(path, buffer)?;

        Ok(())
    }
}
