use crate::basemap::{BasemapError, BasemapPolygons};
use crate::config::{Config, LayerSpec};
use crate::extract::{self, ExportError};
use crate::raster::{GeometryError, RasterLayer};
use crate::readers;
use crate::render::{CompositeFigure, HeatmapPlot, PlotLabels, RenderError};
use crate::sites::{self, SiteTableError};

use log::{info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum PipelineError {
    LayerLoad { layer: String, message: String },
    Sites(SiteTableError),
    Export(ExportError),
    Basemap(BasemapError),
    Geometry(GeometryError),
    Render { figure: String, message: String },
    Io(std::io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::LayerLoad { layer, message } => {
                write!(f, "Failed to load layer '{}': {}", layer, message)
            }
            PipelineError::Sites(e) => write!(f, "{}", e),
            PipelineError::Export(e) => write!(f, "{}", e),
            PipelineError::Basemap(e) => write!(f, "{}", e),
            PipelineError::Geometry(e) => write!(f, "{}", e),
            PipelineError::Render { figure, message } => {
                write!(f, "Failed to render '{}': {}", figure, message)
            }
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<SiteTableError> for PipelineError {
    fn from(err: SiteTableError) -> PipelineError {
        PipelineError::Sites(err)
    }
}

impl From<ExportError> for PipelineError {
    fn from(err: ExportError) -> PipelineError {
        PipelineError::Export(err)
    }
}

impl From<BasemapError> for PipelineError {
    fn from(err: BasemapError) -> PipelineError {
        PipelineError::Basemap(err)
    }
}

impl From<GeometryError> for PipelineError {
    fn from(err: GeometryError) -> PipelineError {
        PipelineError::Geometry(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> PipelineError {
        PipelineError::Io(err)
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub sites: usize,
    pub layers: usize,
    pub missing_values: usize,
    pub table: PathBuf,
    pub figures: Vec<PathBuf>,
}

/// Drives both branches of the pipeline: extraction to the covariate table,
/// then cropping and rendering. Stages hand each other explicit values;
/// the first error aborts the run.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let layers = self.load_layers()?;

        let sites = sites::load_sites(self.config.site_table())?;
        info!(
            "Loaded {} sites from {}",
            sites.len(),
            self.config.site_table()
        );

        let table = extract::extract_covariates(&sites, &layers);
        let missing_values = table.missing_count();
        if missing_values > 0 {
            warn!("{} extracted values are missing", missing_values);
        }

        self.create_output_directories()?;

        table.export(self.config.table_output())?;
        info!("Wrote covariate table to {}", self.config.table_output());

        let basemap =
            BasemapPolygons::from_geojson(self.config.basemap())?.crop(self.config.bbox());
        if basemap.is_empty() {
            warn!("No basemap rings intersect the bounding box");
        }

        let plots = self.build_plots(&layers, &basemap)?;
        let mut figures = Vec::new();

        for (spec, plot) in self.config.raster_layers().iter().zip(&plots) {
            let path = self.config.heatmap_output(&spec.name);
            plot.render_to_file(&path, self.config.figure())
                .map_err(|e| render_error(&path, e))?;

            info!("Wrote heatmap {}", path.display());
            figures.push(path);
        }

        for composite in self.config.composites() {
            let panels = composite
                .variables
                .iter()
                .map(|variable| {
                    // Config validation guarantees the variable resolves
                    let index = self
                        .config
                        .raster_layers()
                        .iter()
                        .position(|spec| &spec.name == variable)
                        .expect("validated composite variable");
                    &plots[index]
                })
                .collect();

            let path = self.config.composite_output(composite);
            CompositeFigure::new(panels, composite.columns)
                .and_then(|figure| figure.render_to_file(&path, self.config.figure()))
                .map_err(|e| render_error(&path, e))?;

            info!("Wrote composite {}", path.display());
            figures.push(path);
        }

        Ok(RunSummary {
            sites: sites.len(),
            layers: layers.len(),
            missing_values,
            table: PathBuf::from(self.config.table_output()),
            figures,
        })
    }

    fn load_layers(&self) -> Result<Vec<RasterLayer>, PipelineError> {
        let mut layers = Vec::new();

        for spec in self.config.raster_layers() {
            let layer = load_layer(spec)?;
            info!(
                "Loaded layer '{}' ({} x {}) from {}",
                spec.name,
                layer.shape().0,
                layer.shape().1,
                spec.path
            );
            layers.push(layer);
        }

        // Downstream joins assume one grid shape; disagreement is suspect
        // but not fatal
        if let Some(first) = layers.first() {
            for layer in &layers[1..] {
                if layer.shape() != first.shape() {
                    warn!(
                        "Layer '{}' has shape {:?}, expected {:?}",
                        layer.name(),
                        layer.shape(),
                        first.shape()
                    );
                }
            }
        }

        Ok(layers)
    }

    fn build_plots(
        &self,
        layers: &[RasterLayer],
        basemap: &BasemapPolygons,
    ) -> Result<Vec<HeatmapPlot>, PipelineError> {
        self.config
            .raster_layers()
            .iter()
            .zip(layers)
            .map(|(spec, layer)| {
                let grid = layer.crop(self.config.bbox())?;

                Ok(HeatmapPlot {
                    grid,
                    basemap: basemap.clone(),
                    scale: self.config.color_scale(&spec.category).clone(),
                    labels: PlotLabels {
                        title: spec.title.clone(),
                        x_label: "Longitude".to_string(),
                        y_label: "Latitude".to_string(),
                        units: spec.units.clone(),
                    },
                })
            })
            .collect()
    }

    fn create_output_directories(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(self.config.output_directory())?;

        if let Some(parent) = Path::new(self.config.table_output()).parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        Ok(())
    }
}

fn load_layer(spec: &LayerSpec) -> Result<RasterLayer, PipelineError> {
    let reader = readers::create_reader(spec.path.clone()).map_err(|e| {
        PipelineError::LayerLoad {
            layer: spec.name.clone(),
            message: e.to_string(),
        }
    })?;

    let grid = reader.read_grid().map_err(|e| PipelineError::LayerLoad {
        layer: spec.name.clone(),
        message: e.to_string(),
    })?;

    Ok(RasterLayer::new(spec.name.clone(), grid))
}

fn render_error(path: &Path, err: RenderError) -> PipelineError {
    PipelineError::Render {
        figure: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_string_lossy().to_string()
    }

    fn fixture_config(dir: &Path) -> Config {
        let sst = write_file(
            dir,
            "sst_mean.asc",
            "ncols 5\n\
             nrows 3\n\
             xllcorner -20.0\n\
             yllcorner 35.0\n\
             cellsize 10.0\n\
             NODATA_value -9999\n\
             10.0 11.0 12.0 13.0 14.0\n\
             12.0 -9999 14.0 15.0 16.0\n\
             14.0 15.0 16.0 17.0 18.0\n",
        );
        let sbt = write_file(
            dir,
            "sbt_mean.asc",
            "ncols 5\n\
             nrows 3\n\
             xllcorner -20.0\n\
             yllcorner 35.0\n\
             cellsize 10.0\n\
             NODATA_value -9999\n\
             6.0 7.0 8.0 9.0 10.0\n\
             8.0 9.0 10.0 11.0 12.0\n\
             10.0 11.0 12.0 13.0 14.0\n",
        );
        let sites = write_file(
            dir,
            "sites.csv",
            "site,lon,lat\n\
             GAL,-15.0,60.0\n\
             BRE,5.0,40.0\n\
             FAR,45.0,40.0\n",
        );
        let basemap = write_file(
            dir,
            "land.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates":
                   [[[0.0, 40.0], [10.0, 40.0], [10.0, 50.0], [0.0, 50.0], [0.0, 40.0]]]}}
            ]}"#,
        );

        let output = dir.join("output");
        let config = format!(
            r##"{{
                "site_table": "{sites}",
                "basemap": "{basemap}",
                "output_directory": "{output}",
                "table_output": "{output}/covariates.csv",
                "bbox": {{"xmin": -20.0, "xmax": 30.0, "ymin": 35.0, "ymax": 65.0}},
                "raster_layers": [
                    {{"name": "sst_mean", "path": "{sst}", "category": "temperature",
                      "title": "Mean sea surface temperature", "units": "°C"}},
                    {{"name": "sbt_mean", "path": "{sbt}", "category": "temperature",
                      "title": "Mean sea bottom temperature", "units": "°C"}}
                ],
                "color_scales": {{
                    "temperature": {{"colors": ["#2c7bb6", "#ffffbf", "#d7191c"], "limits": [0.0, 22.0]}}
                }},
                "figure": {{"width": 320, "height": 240, "scale": 1}},
                "composites": [
                    {{"variables": ["sst_mean", "sbt_mean"], "output": "temperature_panels.png"}}
                ]
            }}"##,
            output = output.display(),
        );

        let path = write_file(dir, "pipeline.json", &config);
        Config::from_file(path).unwrap()
    }

    #[test]
    fn test_full_run_produces_table_and_figures() {
        let dir = tempdir().unwrap();
        let config = fixture_config(dir.path());

        let summary = Pipeline::new(config).run().unwrap();

        assert_eq!(summary.sites, 3);
        assert_eq!(summary.layers, 2);
        // FAR is outside both layers
        assert_eq!(summary.missing_values, 2);
        assert!(summary.table.exists());
        assert_eq!(summary.figures.len(), 3);
        for figure in &summary.figures {
            assert!(figure.exists());
        }
    }

    #[test]
    fn test_rerun_is_idempotent_for_the_table() {
        let dir = tempdir().unwrap();
        let config = fixture_config(dir.path());
        let pipeline = Pipeline::new(config);

        let first = pipeline.run().unwrap();
        let table_first = fs::read(&first.table).unwrap();

        let second = pipeline.run().unwrap();
        let table_second = fs::read(&second.table).unwrap();

        assert_eq!(table_first, table_second);

        // Figures are deterministic too
        for figure in &second.figures {
            let bytes = fs::read(figure).unwrap();
            assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        }
    }

    #[test]
    fn test_disjoint_bbox_aborts_the_run() {
        let dir = tempdir().unwrap();
        fixture_config(dir.path());

        // Rewrite the config with a bbox far from the layers
        let path = dir.path().join("pipeline.json");
        let content = fs::read_to_string(&path)
            .unwrap()
            .replace("\"xmin\": -20.0, \"xmax\": 30.0", "\"xmin\": 100.0, \"xmax\": 120.0")
            .replace("\"ymin\": 35.0, \"ymax\": 65.0", "\"ymin\": -10.0, \"ymax\": 10.0");
        fs::write(&path, content).unwrap();

        let err = Pipeline::new(Config::from_file(&path).unwrap())
            .run()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Geometry(_)));
    }

    #[test]
    fn test_missing_layer_file_names_the_layer() {
        let dir = tempdir().unwrap();
        let config = fixture_config(dir.path());

        fs::remove_file(dir.path().join("sst_mean.asc")).unwrap();

        let err = Pipeline::new(config).run().unwrap_err();
        match err {
            PipelineError::LayerLoad { layer, .. } => assert_eq!(layer, "sst_mean"),
            other => panic!("Expected LayerLoad, got {}", other),
        }
    }
}
