use crate::bbox::Bbox;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug)]
pub enum BasemapError {
    Io(std::io::Error),
    Json(serde_json::Error),
    BadCoordinate(String),
}

impl fmt::Display for BasemapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasemapError::Io(e) => write!(f, "Failed to open basemap: {}", e),
            BasemapError::Json(e) => write!(f, "Failed to parse basemap GeoJSON: {}", e),
            BasemapError::BadCoordinate(msg) => write!(f, "Bad basemap coordinate: {}", msg),
        }
    }
}

impl std::error::Error for BasemapError {}

impl From<std::io::Error> for BasemapError {
    fn from(err: std::io::Error) -> BasemapError {
        BasemapError::Io(err)
    }
}

impl From<serde_json::Error> for BasemapError {
    fn from(err: serde_json::Error) -> BasemapError {
        BasemapError::Json(err)
    }
}

// Only the GeoJSON shapes a landmass file carries. Other geometry types are
// skipped rather than rejected.
#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// One closed landmass ring. Rings sharing a `group` belong to the same
/// landmass and are drawn together.
#[derive(Debug, Clone, PartialEq)]
pub struct LandRing {
    pub group: usize,
    pub coords: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct BasemapPolygons {
    pub rings: Vec<LandRing>,
}

impl BasemapPolygons {
    /// Load landmass outer rings from a GeoJSON FeatureCollection. One group
    /// id per feature, so multi-part landmasses stay associated. Interior
    /// (lake) rings are dropped.
    pub fn from_geojson<P: AsRef<Path>>(path: P) -> Result<Self, BasemapError> {
        let file = File::open(path)?;
        let collection: FeatureCollection = serde_json::from_reader(BufReader::new(file))?;

        let mut rings = Vec::new();

        for (group, feature) in collection.features.iter().enumerate() {
            match &feature.geometry {
                Some(Geometry::Polygon { coordinates }) => {
                    if let Some(outer) = coordinates.first() {
                        rings.push(to_ring(group, outer)?);
                    }
                }
                Some(Geometry::MultiPolygon { coordinates }) => {
                    for polygon in coordinates {
                        if let Some(outer) = polygon.first() {
                            rings.push(to_ring(group, outer)?);
                        }
                    }
                }
                Some(Geometry::Unsupported) | None => {}
            }
        }

        Ok(Self { rings })
    }

    /// Clip every ring to the bounding box. Rings left with fewer than three
    /// vertices are dropped.
    pub fn crop(&self, bbox: &Bbox) -> BasemapPolygons {
        let rings = self
            .rings
            .iter()
            .filter_map(|ring| {
                let coords = clip_ring_to_bbox(&ring.coords, bbox);
                (coords.len() >= 3).then_some(LandRing {
                    group: ring.group,
                    coords,
                })
            })
            .collect();

        BasemapPolygons { rings }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

fn to_ring(group: usize, positions: &[Vec<f64>]) -> Result<LandRing, BasemapError> {
    let mut coords = positions
        .iter()
        .map(|position| match position[..] {
            [lon, lat, ..] => Ok((lon, lat)),
            _ => Err(BasemapError::BadCoordinate(format!(
                "Position with {} ordinates in feature {}",
                position.len(),
                group
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    // GeoJSON rings repeat the first vertex at the end; the drawing side
    // expects an open ring
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }

    Ok(LandRing { group, coords })
}

/// Sutherland-Hodgman clipping of one ring against the four box edges.
fn clip_ring_to_bbox(coords: &[(f64, f64)], bbox: &Bbox) -> Vec<(f64, f64)> {
    // Per edge: a half-plane test and the segment/edge intersection
    type Edge = (
        fn(&(f64, f64), f64) -> bool,
        fn(&(f64, f64), &(f64, f64), f64) -> (f64, f64),
    );

    let edges: [(Edge, f64); 4] = [
        ((|p, x| p.0 >= x, intersect_vertical), bbox.xmin),
        ((|p, x| p.0 <= x, intersect_vertical), bbox.xmax),
        ((|p, y| p.1 >= y, intersect_horizontal), bbox.ymin),
        ((|p, y| p.1 <= y, intersect_horizontal), bbox.ymax),
    ];

    let mut output = coords.to_vec();

    for ((inside, intersect), bound) in edges {
        if output.is_empty() {
            break;
        }

        let input = std::mem::take(&mut output);

        for i in 0..input.len() {
            let current = input[i];
            let previous = input[(i + input.len() - 1) % input.len()];

            let current_in = inside(&current, bound);
            let previous_in = inside(&previous, bound);

            if current_in {
                if !previous_in {
                    output.push(intersect(&previous, &current, bound));
                }
                output.push(current);
            } else if previous_in {
                output.push(intersect(&previous, &current, bound));
            }
        }
    }

    output
}

fn intersect_vertical(a: &(f64, f64), b: &(f64, f64), x: f64) -> (f64, f64) {
    let t = (x - a.0) / (b.0 - a.0);
    (x, a.1 + t * (b.1 - a.1))
}

fn intersect_horizontal(a: &(f64, f64), b: &(f64, f64), y: f64) -> (f64, f64) {
    let t = (y - a.1) / (b.1 - a.1);
    (a.0 + t * (b.0 - a.0), y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn bbox() -> Bbox {
        Bbox::new(-20.0, 30.0, 35.0, 65.0).unwrap()
    }

    #[test]
    fn test_from_geojson_groups_rings_by_feature() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("land.geojson");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"{
              "type": "FeatureCollection",
              "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates":
                   [[[0.0, 40.0], [10.0, 40.0], [10.0, 50.0], [0.0, 50.0], [0.0, 40.0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiPolygon", "coordinates":
                   [[[[20.0, 40.0], [25.0, 40.0], [25.0, 45.0], [20.0, 40.0]]],
                    [[[26.0, 50.0], [28.0, 50.0], [28.0, 52.0], [26.0, 50.0]]]]}}
              ]
            }"#,
        )
        .unwrap();

        let basemap = BasemapPolygons::from_geojson(&path).unwrap();

        assert_eq!(basemap.rings.len(), 3);
        assert_eq!(basemap.rings[0].group, 0);
        // Both parts of the second landmass share one group
        assert_eq!(basemap.rings[1].group, 1);
        assert_eq!(basemap.rings[2].group, 1);
        // Closing vertex is dropped
        assert_eq!(basemap.rings[0].coords.len(), 4);
    }

    #[test]
    fn test_ring_inside_bbox_is_unchanged() {
        let ring = LandRing {
            group: 0,
            coords: vec![(0.0, 40.0), (10.0, 40.0), (10.0, 50.0), (0.0, 50.0)],
        };
        let basemap = BasemapPolygons { rings: vec![ring.clone()] };

        let cropped = basemap.crop(&bbox());
        assert_eq!(cropped.rings, vec![ring]);
    }

    #[test]
    fn test_ring_outside_bbox_is_dropped() {
        let basemap = BasemapPolygons {
            rings: vec![LandRing {
                group: 0,
                coords: vec![(100.0, 0.0), (110.0, 0.0), (110.0, 10.0)],
            }],
        };

        assert!(basemap.crop(&bbox()).is_empty());
    }

    #[test]
    fn test_straddling_ring_is_clipped_to_the_box() {
        let basemap = BasemapPolygons {
            rings: vec![LandRing {
                group: 0,
                // Extends past xmax = 30
                coords: vec![(20.0, 40.0), (40.0, 40.0), (40.0, 50.0), (20.0, 50.0)],
            }],
        };

        let cropped = basemap.crop(&bbox());
        assert_eq!(cropped.rings.len(), 1);

        let box_ = bbox();
        for &(lon, lat) in &cropped.rings[0].coords {
            assert!(box_.contains(lon, lat));
        }
        // The clipped edge lies on xmax
        assert!(cropped.rings[0].coords.iter().any(|&(lon, _)| lon == 30.0));
    }
}
