//! Named spatial reference systems known to the pipeline.
//!
//! The registry is a fixed table: a geographic system (`WGS84`) and the
//! spherical web-mercator system (`900913`) used as the working projection
//! of every generated stylesheet.

/// A named projection with its proj4 definition and full bounding extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Registry name, e.g. `900913`
    pub id: &'static str,
    /// proj4 definition string
    pub srs: &'static str,
    /// Extent as `[min-x, min-y, max-x, max-y]` in projection units
    pub extent: [f64; 4],
}

/// Geographic longitude/latitude on the WGS84 ellipsoid.
pub const WGS84: Projection = Projection {
    id: "WGS84",
    srs: "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs",
    extent: [-180.0, -90.0, 180.0, 90.0],
};

/// Spherical web-mercator, the working projection of all stylesheets.
pub const WEB_MERCATOR: Projection = Projection {
    id: "900913",
    srs: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 +x_0=0.0 +y_0=0.0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs +over",
    extent: [
        -20_037_508.34,
        -20_037_508.34,
        20_037_508.34,
        20_037_508.34,
    ],
};

/// All registered projections.
pub const PROJECTIONS: [Projection; 2] = [WGS84, WEB_MERCATOR];

/// Find a projection by its registry name.
#[must_use]
pub fn lookup(id: &str) -> Option<&'static Projection> {
    PROJECTIONS.iter().find(|p| p.id == id)
}

/// Find a projection whose proj4 definition is exactly `srs`.
///
/// Only a literal match counts: `+proj=merc ...` with a different parameter
/// order is not recognized.
#[must_use]
pub fn find_by_srs(srs: &str) -> Option<&'static Projection> {
    PROJECTIONS.iter().find(|p| p.srs == srs)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::wgs84("WGS84", -180.0)]
    #[case::mercator("900913", -20_037_508.34)]
    fn lookup_known(#[case] id: &str, #[case] min_x: f64) {
        let proj = lookup(id).unwrap();
        assert_eq!(proj.id, id);
        assert!((proj.extent[0] - min_x).abs() < f64::EPSILON);
    }

    #[test]
    fn lookup_unknown() {
        assert!(lookup("EPSG:3857").is_none());
        assert!(lookup("wgs84").is_none());
    }

    #[test]
    fn srs_must_match_literally() {
        assert_eq!(find_by_srs(WEB_MERCATOR.srs), Some(&WEB_MERCATOR));
        assert_eq!(find_by_srs(WGS84.srs), Some(&WGS84));
        assert!(find_by_srs("900913").is_none());
        assert!(find_by_srs("+proj=longlat +datum=WGS84").is_none());
    }
}
