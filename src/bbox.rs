use serde::Deserialize;

/// Geographic crop rectangle shared by every cropped layer and the basemap
/// in one run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bbox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bbox {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Self, String> {
        if !(-180.0..=180.0).contains(&xmin) || !(-180.0..=180.0).contains(&xmax) {
            return Err("Longitude values must be between -180 and 180".to_string());
        }

        if !(-90.0..=90.0).contains(&ymin) || !(-90.0..=90.0).contains(&ymax) {
            return Err("Latitude values must be between -90 and 90".to_string());
        }

        if xmin > xmax || ymin > ymax {
            return Err("Min values must be <= max values".to_string());
        }

        Ok(Bbox {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.xmin..=self.xmax).contains(&lon) && (self.ymin..=self.ymax).contains(&lat)
    }

    /// True when the two rectangles share any area or boundary.
    pub fn intersects(&self, other: &Bbox) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

#[cfg(test)]
mod test {
    use crate::bbox::Bbox;

    #[test]
    fn test_bbox_coords_are_within_ranges() {
        // Test valid coordinates
        let valid_bbox = Bbox::new(-20.0, 30.0, 35.0, 65.0);
        assert!(valid_bbox.is_ok());

        // Test longitude out of range
        let invalid_lon = Bbox::new(-200.0, 0.0, 0.0, 10.0);
        assert!(invalid_lon.is_err());

        let invalid_lon2 = Bbox::new(0.0, 200.0, 0.0, 10.0);
        assert!(invalid_lon2.is_err());

        // Test latitude out of range
        let invalid_lat = Bbox::new(0.0, 10.0, -100.0, 0.0);
        assert!(invalid_lat.is_err());

        let invalid_lat2 = Bbox::new(0.0, 10.0, 0.0, 100.0);
        assert!(invalid_lat2.is_err());

        // Test min > max
        let invalid_order_lon = Bbox::new(10.0, 0.0, 0.0, 10.0);
        assert!(invalid_order_lon.is_err());

        let invalid_order_lat = Bbox::new(0.0, 10.0, 10.0, 0.0);
        assert!(invalid_order_lat.is_err());
    }

    #[test]
    fn test_contains_is_inclusive_on_edges() {
        let bbox = Bbox::new(-20.0, 30.0, 35.0, 65.0).unwrap();

        assert!(bbox.contains(0.0, 50.0));
        assert!(bbox.contains(-20.0, 35.0));
        assert!(bbox.contains(30.0, 65.0));

        assert!(!bbox.contains(-20.1, 50.0));
        assert!(!bbox.contains(0.0, 65.1));
    }

    #[test]
    fn test_intersects() {
        let bbox = Bbox::new(-20.0, 30.0, 35.0, 65.0).unwrap();

        let overlapping = Bbox::new(20.0, 40.0, 60.0, 70.0).unwrap();
        assert!(bbox.intersects(&overlapping));

        // Shared edge counts as intersecting
        let touching = Bbox::new(30.0, 40.0, 35.0, 65.0).unwrap();
        assert!(bbox.intersects(&touching));

        let disjoint = Bbox::new(40.0, 50.0, 0.0, 10.0).unwrap();
        assert!(!bbox.intersects(&disjoint));
    }

    #[test]
    fn test_spans() {
        let bbox = Bbox::new(-20.0, 30.0, 35.0, 65.0).unwrap();
        assert_eq!(bbox.width(), 50.0);
        assert_eq!(bbox.height(), 30.0);
    }
}
