use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bbox::Bbox;
use crate::render::{ColorScale, FigureSize};

pub mod error;
pub use error::ConfigError;

/// One raster layer declaration. Declaration order fixes the covariate
/// table's column order and the order individual figures are produced.
#[derive(Debug, Deserialize, Clone)]
pub struct LayerSpec {
    pub name: String,
    pub path: String,
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub units: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompositeSpec {
    pub variables: Vec<String>,
    pub output: String,
    #[serde(default = "default_columns")]
    pub columns: usize,
}

fn default_columns() -> usize {
    2
}

#[derive(Debug, Clone)]
pub struct Config {
    site_table: String,
    basemap: String,
    output_directory: String,
    table_output: String,
    bbox: Bbox,
    raster_layers: Vec<LayerSpec>,
    color_scales: HashMap<String, ColorScale>,
    figure: FigureSize,
    composites: Vec<CompositeSpec>,
}

// Deserializes a Config, validating the bbox, figure dimensions, and the
// cross-references between layers, color scales, and composites.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            site_table: String,
            basemap: String,
            output_directory: String,
            table_output: String,
            bbox: BboxHelper,
            raster_layers: Vec<LayerSpec>,
            color_scales: HashMap<String, ColorScale>,
            figure: FigureSize,
            #[serde(default)]
            composites: Vec<CompositeSpec>,
        }

        #[derive(Deserialize)]
        struct BboxHelper {
            xmin: f64,
            xmax: f64,
            ymin: f64,
            ymax: f64,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let bbox = Bbox::new(
            helper.bbox.xmin,
            helper.bbox.xmax,
            helper.bbox.ymin,
            helper.bbox.ymax,
        )
        .map_err(|e| D::Error::custom(format!("Invalid bbox: {}", e)))?;

        if helper.figure.width == 0 || helper.figure.height == 0 {
            return Err(D::Error::custom(ConfigError::FigureDimensions));
        }

        if helper.raster_layers.is_empty() {
            return Err(D::Error::custom(ConfigError::EmptyLayers));
        }

        let mut names = HashSet::new();
        for layer in &helper.raster_layers {
            if !names.insert(layer.name.as_str()) {
                return Err(D::Error::custom(ConfigError::DuplicateLayer(
                    layer.name.clone(),
                )));
            }

            if !helper.color_scales.contains_key(&layer.category) {
                return Err(D::Error::custom(ConfigError::MissingScale(
                    layer.category.clone(),
                )));
            }
        }

        for composite in &helper.composites {
            if composite.variables.len() < 2 {
                return Err(D::Error::custom(ConfigError::CompositeTooFew(
                    composite.output.clone(),
                )));
            }

            for variable in &composite.variables {
                if !names.contains(variable.as_str()) {
                    return Err(D::Error::custom(ConfigError::UnknownVariable(
                        variable.clone(),
                    )));
                }
            }
        }

        Ok(Config {
            site_table: helper.site_table,
            basemap: helper.basemap,
            output_directory: helper.output_directory,
            table_output: helper.table_output,
            bbox,
            raster_layers: helper.raster_layers,
            color_scales: helper.color_scales,
            figure: helper.figure,
            composites: helper.composites,
        })
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn site_table(&self) -> &str {
        &self.site_table
    }

    pub fn basemap(&self) -> &str {
        &self.basemap
    }

    pub fn output_directory(&self) -> &str {
        &self.output_directory
    }

    pub fn table_output(&self) -> &str {
        &self.table_output
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    pub fn raster_layers(&self) -> &[LayerSpec] {
        &self.raster_layers
    }

    pub fn figure(&self) -> &FigureSize {
        &self.figure
    }

    pub fn composites(&self) -> &[CompositeSpec] {
        &self.composites
    }

    /// The scale for a layer's category. Config validation guarantees the
    /// entry exists.
    pub fn color_scale(&self, category: &str) -> &ColorScale {
        &self.color_scales[category]
    }

    /// Output path for one layer's individual heatmap.
    pub fn heatmap_output(&self, layer: &str) -> PathBuf {
        Path::new(&self.output_directory).join(format!("{}.png", layer))
    }

    /// Output path for a composite figure.
    pub fn composite_output(&self, composite: &CompositeSpec) -> PathBuf {
        Path::new(&self.output_directory).join(&composite.output)
    }
}
