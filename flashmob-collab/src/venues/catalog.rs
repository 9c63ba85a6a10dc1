use flashmob_core::Coordinates;

use crate::db::VenueData;

type Row = (&'static str, &'static str, &'static str, f64, f64, &'static str, i32, i32, f64);

/// Study venues every new store starts out with.
/// Columns are id, name, address, lat, lng, category, wifi, noise, rating.
#[rustfmt::skip]
const VENUES: &[Row] = &[
    ("V001", "UCM James C. Kirkpatrick Library", "100 E South St, Warrensburg, MO", 38.7625, -93.7344, "library", 5, 1, 4.9),
    ("V002", "Trails Regional Library", "432 N Holden St, Warrensburg, MO", 38.7644, -93.7397, "library", 5, 2, 4.7),
    ("V003", "Main Street Coffee House", "117 N Holden St, Warrensburg, MO", 38.7623, -93.739, "cafe", 4, 3, 4.3),
    ("V004", "UCM Student Union Study Lounge", "300 S Holden St, Warrensburg, MO", 38.7595, -93.738, "study_lounge", 5, 2, 4.5),
    ("V005", "Ground Zero Coffee", "105 E Pine St, Warrensburg, MO", 38.7618, -93.7365, "cafe", 4, 3, 4.2),
    ("V006", "Kansas City Public Library - Central", "14 W 10th St, Kansas City, MO", 39.1006, -94.5827, "library", 5, 2, 4.8),
    ("V007", "UMKC Miller Nichols Library", "800 E 51st St, Kansas City, MO", 39.0352, -94.5767, "library", 5, 2, 4.7),
    ("V008", "Broadway Cafe & Roastery", "4012 Broadway, Kansas City, MO", 39.0587, -94.5897, "cafe", 4, 3, 4.2),
    ("V009", "Johnson County Library - Central", "9875 W 87th St, Overland Park, KS", 38.9622, -94.6708, "library", 5, 1, 4.9),
    ("V010", "The Roasterie Cafe", "1204 W 27th St, Kansas City, MO", 39.0778, -94.5952, "cafe", 4, 3, 4.1),
    ("V011", "Kansas City Public Library - Plaza", "4801 Main St, Kansas City, MO", 39.0416, -94.5886, "library", 5, 2, 4.6),
    ("V012", "Quay Coffee", "413 Delaware St, Kansas City, MO", 39.1063, -94.5844, "cafe", 4, 3, 4.3),
    ("V013", "Johnson County Library - Olathe", "201 N Chestnut St, Olathe, KS", 38.8831, -94.8191, "library", 5, 2, 4.7),
    ("V014", "New York Public Library - Main", "476 5th Ave, New York, NY", 40.7532, -73.9822, "library", 5, 2, 4.9),
    ("V015", "Columbia University Butler Library", "535 W 114th St, New York, NY", 40.8066, -73.9635, "library", 5, 1, 4.8),
    ("V016", "Think Coffee Union Square", "123 4th Ave, New York, NY", 40.7338, -73.9898, "cafe", 4, 4, 4.0),
    ("V017", "Los Angeles Central Library", "630 W 5th St, Los Angeles, CA", 34.0522, -118.2571, "library", 5, 2, 4.7),
    ("V018", "UCLA Powell Library", "100 Powell Library, Los Angeles, CA", 34.0722, -118.4422, "library", 5, 2, 4.8),
    ("V019", "Blue Bottle Coffee - Arts District", "582 Mateo St, Los Angeles, CA", 34.0392, -118.2314, "cafe", 4, 3, 4.2),
    ("V020", "Harold Washington Library Center", "400 S State St, Chicago, IL", 41.8761, -87.6286, "library", 5, 2, 4.8),
    ("V021", "University of Chicago Regenstein Library", "1100 E 57th St, Chicago, IL", 41.7906, -87.5987, "library", 5, 1, 4.9),
    ("V022", "Intelligentsia Coffee - Millennium Park", "53 E Randolph St, Chicago, IL", 41.8844, -87.6244, "cafe", 4, 3, 4.1),
    ("V023", "Houston Public Library - Central", "500 McKinney St, Houston, TX", 29.762, -95.3698, "library", 5, 2, 4.7),
    ("V024", "Rice University Fondren Library", "6100 Main St, Houston, TX", 29.7174, -95.3988, "library", 5, 1, 4.8),
    ("V025", "Burton Barr Central Library", "1221 N Central Ave, Phoenix, AZ", 33.4635, -112.0731, "library", 5, 2, 4.6),
    ("V026", "ASU Hayden Library", "1000 S Cady Mall, Tempe, AZ", 33.4175, -111.9344, "library", 5, 2, 4.7),
    ("V027", "Seattle Central Library", "1000 4th Ave, Seattle, WA", 47.6062, -122.3328, "library", 5, 2, 4.9),
    ("V028", "UW Suzzallo Library", "4000 15th Ave NE, Seattle, WA", 47.6566, -122.3089, "library", 5, 1, 4.8),
    ("V029", "Boston Public Library - Copley", "700 Boylston St, Boston, MA", 42.3493, -71.0778, "library", 5, 2, 4.8),
    ("V030", "MIT Libraries - Hayden", "160 Memorial Dr, Cambridge, MA", 42.3601, -71.0942, "library", 5, 1, 4.9),
    ("V031", "San Francisco Main Library", "100 Larkin St, San Francisco, CA", 37.7794, -122.4156, "library", 5, 2, 4.7),
    ("V032", "Blue Bottle Coffee - Ferry Building", "1 Ferry Building, San Francisco, CA", 37.7956, -122.3934, "cafe", 4, 4, 4.0),
    ("V033", "Denver Public Library - Central", "10 W 14th Ave Pkwy, Denver, CO", 39.7373, -104.9885, "library", 5, 2, 4.7),
    ("V034", "CU Denver Auraria Library", "1100 Lawrence St, Denver, CO", 39.7447, -105.0013, "library", 5, 2, 4.6),
];

/// Returns the built-in venue catalog
pub fn seed_venues() -> Vec<VenueData> {
    VENUES
        .iter()
        .map(
            |&(id, name, address, lat, lng, category, wifi_quality, noise_level, study_rating)| {
                VenueData {
                    id: id.to_string(),
                    name: name.to_string(),
                    address: address.to_string(),
                    coordinates: Coordinates::new(lat, lng),
                    category: category.to_string(),
                    wifi_quality,
                    noise_level,
                    study_rating,
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::seed_venues;

    #[test]
    fn test_catalog_is_well_formed() {
        let venues = seed_venues();
        let ids: HashSet<_> = venues.iter().map(|v| v.id.as_str()).collect();

        assert_eq!(ids.len(), venues.len(), "venue ids should be unique");

        for venue in &venues {
            assert!((1..=5).contains(&venue.wifi_quality), "{}", venue.id);
            assert!((1..=5).contains(&venue.noise_level), "{}", venue.id);
            assert!((0.0..=5.0).contains(&venue.study_rating), "{}", venue.id);
        }
    }
}
