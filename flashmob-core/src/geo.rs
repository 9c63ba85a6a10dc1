use serde::{Deserialize, Serialize};

/// The mean radius of the earth, in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// A point on the globe, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the great-circle distance to another point, in miles
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Computes the haversine distance between two points, in miles. Always finite for finite input.
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.).sin().powi(2);

    // Rounding can push `a` slightly past 1 for antipodal points
    let a = a.clamp(0., 1.);
    let c = 2. * a.sqrt().atan2((1. - a).sqrt());

    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod test {
    use super::*;

    const WARRENSBURG: Coordinates = Coordinates::new(38.7625, -93.7344);
    const KANSAS_CITY: Coordinates = Coordinates::new(39.1006, -94.5827);
    const NEW_YORK: Coordinates = Coordinates::new(40.7128, -74.0060);
    const LOS_ANGELES: Coordinates = Coordinates::new(34.0522, -118.2437);

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(WARRENSBURG.distance_to(&WARRENSBURG), 0.);
        assert_eq!(distance(0., 0., 0., 0.), 0.);
        assert_eq!(distance(-33.9, 151.2, -33.9, 151.2), 0.);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (WARRENSBURG, KANSAS_CITY),
            (NEW_YORK, LOS_ANGELES),
            (KANSAS_CITY, NEW_YORK),
        ];

        for (a, b) in pairs {
            let there = a.distance_to(&b);
            let back = b.distance_to(&a);

            assert!(
                (there - back).abs() < 1e-9,
                "distance should be symmetric, got {there} and {back}"
            );
        }
    }

    #[test]
    fn test_known_distances() {
        let local = WARRENSBURG.distance_to(&KANSAS_CITY);
        assert!(
            (local - 51.23).abs() < 0.05,
            "Warrensburg to Kansas City should be ~51 miles, got {local}"
        );

        let coast_to_coast = NEW_YORK.distance_to(&LOS_ANGELES);
        assert!(
            (coast_to_coast - 2445.7).abs() < 1.,
            "New York to Los Angeles should be ~2446 miles, got {coast_to_coast}"
        );
    }

    #[test]
    fn test_antipodal_points() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_MILES;

        for lat in (-90..=90).step_by(5) {
            for lng in (-180..=180).step_by(5) {
                let (lat, lng) = (lat as f64 + 0.34, lng as f64 - 0.2);
                let far = distance(lat, lng, -lat, lng + 180.);

                assert!(far.is_finite(), "distance from ({lat}, {lng}) to its antipode is {far}");
                assert!(far <= half_circumference + 1e-6);
            }
        }

        assert!(distance(-30.34, -163.8, 30.34, 16.2).is_finite());
    }
}
