use crate::bbox::Bbox;
use crate::readers::Grid;
use std::fmt;

#[derive(Debug)]
pub enum GeometryError {
    NoOverlap { layer: String },
    EmptyCrop { layer: String },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::NoOverlap { layer } => {
                write!(f, "Bounding box does not intersect layer '{}'", layer)
            }
            GeometryError::EmptyCrop { layer } => {
                write!(f, "Bounding box retains no cells of layer '{}'", layer)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// A named raster layer. Immutable once loaded; all sampling is nearest-cell
/// (the cell whose footprint covers the coordinate), no interpolation.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    name: String,
    grid: Grid,
}

/// One retained cell of a cropped layer, positioned at its center.
#[derive(Debug, Clone, Copy)]
pub struct GridCell {
    pub lon: f64,
    pub lat: f64,
    pub value: f32,
}

/// A layer restricted to a bounding box, flattened to cell-center samples.
/// No-data cells inside the box are omitted.
#[derive(Debug, Clone)]
pub struct CroppedGrid {
    pub variable: String,
    pub cellsize: f64,
    pub bbox: Bbox,
    pub cells: Vec<GridCell>,
}

impl RasterLayer {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.grid.ncols, self.grid.nrows)
    }

    /// Latitude of the grid's northern edge.
    fn top(&self) -> f64 {
        self.grid.yllcorner + self.grid.nrows as f64 * self.grid.cellsize
    }

    pub fn extent(&self) -> Bbox {
        Bbox {
            xmin: self.grid.xllcorner,
            xmax: self.grid.xllcorner + self.grid.ncols as f64 * self.grid.cellsize,
            ymin: self.grid.yllcorner,
            ymax: self.top(),
        }
    }

    /// Value of the cell covering (lon, lat). `None` outside the extent or
    /// on a no-data cell. Cell footprints are half-open, so a point exactly
    /// on the top or right edge is outside.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f32> {
        let grid = &self.grid;

        let col = ((lon - grid.xllcorner) / grid.cellsize).floor();
        let row = ((self.top() - lat) / grid.cellsize).floor();

        if col < 0.0 || row < 0.0 || col >= grid.ncols as f64 || row >= grid.nrows as f64 {
            return None;
        }

        let value = grid.values[row as usize * grid.ncols + col as usize];

        (value != grid.nodata).then_some(value)
    }

    /// Restrict the layer to cells whose center falls inside `bbox`.
    pub fn crop(&self, bbox: &Bbox) -> Result<CroppedGrid, GeometryError> {
        if !bbox.intersects(&self.extent()) {
            return Err(GeometryError::NoOverlap {
                layer: self.name.clone(),
            });
        }

        let grid = &self.grid;
        let mut cells = Vec::new();
        let mut retained = 0usize;

        for row in 0..grid.nrows {
            let lat = self.top() - (row as f64 + 0.5) * grid.cellsize;

            for col in 0..grid.ncols {
                let lon = grid.xllcorner + (col as f64 + 0.5) * grid.cellsize;

                if !bbox.contains(lon, lat) {
                    continue;
                }
                retained += 1;

                let value = grid.values[row * grid.ncols + col];
                if value != grid.nodata {
                    cells.push(GridCell { lon, lat, value });
                }
            }
        }

        // A box covering no cell center is treated the same as a disjoint one
        if retained == 0 {
            return Err(GeometryError::EmptyCrop {
                layer: self.name.clone(),
            });
        }

        Ok(CroppedGrid {
            variable: self.name.clone(),
            cellsize: grid.cellsize,
            bbox: *bbox,
            cells,
        })
    }
}

impl CroppedGrid {
    /// Min/max over the retained values, for auto-scaled color limits.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;

        for cell in &self.cells {
            range = match range {
                None => Some((cell.value, cell.value)),
                Some((lo, hi)) => Some((lo.min(cell.value), hi.max(cell.value))),
            };
        }

        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // 4 x 3 grid of 10-degree cells over lon [-20, 20) x lat [35, 65)
    fn test_layer() -> RasterLayer {
        let grid = Grid {
            ncols: 4,
            nrows: 3,
            xllcorner: -20.0,
            yllcorner: 35.0,
            cellsize: 10.0,
            nodata: -9999.0,
            values: vec![
                1.0, 2.0, 3.0, 4.0, // row 0, lat 60
                5.0, -9999.0, 7.0, 8.0, // row 1, lat 50
                9.0, 10.0, 11.0, 12.0, // row 2, lat 40
            ],
        };
        RasterLayer::new("sst_mean", grid)
    }

    #[test]
    fn test_value_at_nearest_cell() {
        let layer = test_layer();

        assert_eq!(layer.value_at(-15.0, 62.0), Some(1.0));
        assert_eq!(layer.value_at(15.0, 36.0), Some(12.0));
        // Anywhere within one cell footprint samples the same cell
        assert_eq!(layer.value_at(-19.9, 55.1), Some(5.0));
        assert_eq!(layer.value_at(-10.1, 50.0), Some(5.0));
    }

    #[test]
    fn test_value_at_is_deterministic() {
        let layer = test_layer();
        let first = layer.value_at(3.7, 47.2);
        let second = layer.value_at(3.7, 47.2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_point_outside_coverage_is_missing_not_an_error() {
        let layer = test_layer();
        assert_eq!(layer.value_at(45.0, 50.0), None);
        assert_eq!(layer.value_at(0.0, 80.0), None);
    }

    #[test]
    fn test_nodata_cell_is_missing() {
        let layer = test_layer();
        assert_eq!(layer.value_at(-5.0, 55.0), None);
    }

    #[test]
    fn test_top_and_right_edges_are_outside() {
        let layer = test_layer();
        assert_eq!(layer.value_at(20.0, 50.0), None);
        assert_eq!(layer.value_at(0.0, 65.0), None);
    }

    #[test]
    fn test_crop_keeps_only_centers_inside_the_box() {
        let layer = test_layer();
        let bbox = Bbox::new(-20.0, 0.0, 35.0, 65.0).unwrap();

        let cropped = layer.crop(&bbox).unwrap();

        // Cell centers at lon -15 and -5, lats 40/50/60; the nodata cell at
        // (-5, 50) is omitted
        assert_eq!(cropped.cells.len(), 5);
        for cell in &cropped.cells {
            assert!(bbox.contains(cell.lon, cell.lat));
        }

        assert_relative_eq!(cropped.cells[0].lon, -15.0);
        assert_relative_eq!(cropped.cells[0].lat, 60.0);
    }

    #[test]
    fn test_crop_disjoint_bbox_is_a_geometry_error() {
        let layer = test_layer();
        let bbox = Bbox::new(100.0, 120.0, -10.0, 10.0).unwrap();

        assert!(matches!(
            layer.crop(&bbox),
            Err(GeometryError::NoOverlap { .. })
        ));
    }

    #[test]
    fn test_crop_with_no_cell_centers_is_a_geometry_error() {
        let layer = test_layer();
        // Overlaps the extent but is too narrow to contain any cell center
        let bbox = Bbox::new(-19.0, -16.0, 36.0, 39.0).unwrap();

        assert!(matches!(
            layer.crop(&bbox),
            Err(GeometryError::EmptyCrop { .. })
        ));
    }

    #[test]
    fn test_value_range() {
        let layer = test_layer();
        let bbox = Bbox::new(-20.0, 20.0, 35.0, 65.0).unwrap();

        let cropped = layer.crop(&bbox).unwrap();
        assert_eq!(cropped.value_range(), Some((1.0, 12.0)));
    }
}
