use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// One georeferenced sampling site from the input table.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplePoint {
    pub site: String,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug)]
pub enum SiteTableError {
    Csv(csv::Error),
    MissingColumn(String),
    DuplicateSite(String),
}

impl fmt::Display for SiteTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteTableError::Csv(e) => write!(f, "Failed to read site table: {}", e),
            SiteTableError::MissingColumn(name) => {
                write!(f, "Site table is missing required column '{}'", name)
            }
            SiteTableError::DuplicateSite(site) => {
                write!(f, "Duplicate site identifier '{}'", site)
            }
        }
    }
}

impl std::error::Error for SiteTableError {}

impl From<csv::Error> for SiteTableError {
    fn from(err: csv::Error) -> SiteTableError {
        SiteTableError::Csv(err)
    }
}

/// Load the site table, preserving input row order. Columns beyond
/// site/lon/lat are ignored.
pub fn load_sites<P: AsRef<Path>>(path: P) -> Result<Vec<SamplePoint>, SiteTableError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for required in ["site", "lon", "lat"] {
        if !headers.iter().any(|h| h == required) {
            return Err(SiteTableError::MissingColumn(required.to_string()));
        }
    }

    let mut seen = HashSet::new();
    let mut sites = Vec::new();

    for record in reader.deserialize() {
        let point: SamplePoint = record?;

        if !seen.insert(point.site.clone()) {
            return Err(SiteTableError::DuplicateSite(point.site));
        }

        sites.push(point);
    }

    Ok(sites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_table(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sites.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_preserves_row_order() {
        let (_dir, path) = write_table(
            "site,lon,lat\n\
             GAL,-5.5,43.5\n\
             BRE,-4.5,48.4\n\
             OSL,10.7,59.9\n",
        );

        let sites = load_sites(&path).unwrap();
        let ids: Vec<&str> = sites.iter().map(|s| s.site.as_str()).collect();

        assert_eq!(ids, vec!["GAL", "BRE", "OSL"]);
        assert_eq!(sites[1].lon, -4.5);
        assert_eq!(sites[1].lat, 48.4);
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let (_dir, path) = write_table(
            "site,lon,lat,depth_m\n\
             GAL,-5.5,43.5,12\n",
        );

        let sites = load_sites(&path).unwrap();
        assert_eq!(sites.len(), 1);
    }

    #[test]
    fn test_missing_column_is_named() {
        let (_dir, path) = write_table(
            "site,lon\n\
             GAL,-5.5\n",
        );

        let err = load_sites(&path).unwrap_err();
        match err {
            SiteTableError::MissingColumn(name) => assert_eq!(name, "lat"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_site_id_is_an_error() {
        let (_dir, path) = write_table(
            "site,lon,lat\n\
             GAL,-5.5,43.5\n\
             GAL,-4.5,48.4\n",
        );

        assert!(matches!(
            load_sites(&path),
            Err(SiteTableError::DuplicateSite(_))
        ));
    }
}
