use async_trait::async_trait;
use flashmob_core::{Coordinates, ErrorKind};
use lazy_static::lazy_static;
use log::{debug, warn};
use thiserror::Error;

/// Where addresses that can't be resolved end up. Warrensburg, MO.
pub const DEFAULT_LOCATION: Coordinates = Coordinates::new(38.7625, -93.7344);

lazy_static! {
    /// Known cities, matched case-insensitively against addresses.
    /// Longer names come first so "Kansas City" wins over shorter overlaps.
    static ref CITIES: Vec<(String, Coordinates)> = {
        let mut cities: Vec<_> = [
            ("warrensburg", Coordinates::new(38.7628, -93.7360)),
            ("kansas city", Coordinates::new(39.0997, -94.5786)),
            ("overland park", Coordinates::new(38.9822, -94.6708)),
            ("olathe", Coordinates::new(38.8814, -94.8191)),
            ("new york", Coordinates::new(40.7128, -74.0060)),
            ("los angeles", Coordinates::new(34.0522, -118.2437)),
            ("chicago", Coordinates::new(41.8781, -87.6298)),
            ("houston", Coordinates::new(29.7604, -95.3698)),
            ("phoenix", Coordinates::new(33.4484, -112.0740)),
            ("tempe", Coordinates::new(33.4255, -111.9400)),
            ("seattle", Coordinates::new(47.6062, -122.3321)),
            ("boston", Coordinates::new(42.3601, -71.0589)),
            ("cambridge", Coordinates::new(42.3736, -71.1097)),
            ("san francisco", Coordinates::new(37.7749, -122.4194)),
            ("denver", Coordinates::new(39.7392, -104.9903)),
        ]
        .into_iter()
        .map(|(name, point)| (name.to_string(), point))
        .collect();

        cities.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
        cities
    };
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("Address cannot be empty")]
    EmptyAddress,
}

impl GeocodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Resolves a postal address to a point on the globe
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Resolves addresses to the center of the city they mention
#[derive(Debug, Default)]
pub struct CityGeocoder;

impl CityGeocoder {
    pub fn lookup(address: &str) -> Option<Coordinates> {
        let address = address.to_lowercase();

        CITIES
            .iter()
            .find(|(name, _)| address.contains(name.as_str()))
            .map(|(_, point)| *point)
    }
}

#[async_trait]
impl Geocoder for CityGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let address = address.trim();

        if address.is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        match Self::lookup(address) {
            Some(point) => {
                debug!("Geocoded {:?} to {}, {}", address, point.lat, point.lng);
                Ok(point)
            }
            None => {
                warn!(
                    "Could not geocode {:?}, falling back to the default location",
                    address
                );
                Ok(DEFAULT_LOCATION)
            }
        }
    }
}
