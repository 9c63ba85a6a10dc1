mod catalog;

pub use catalog::*;

use flashmob_core::{validate_radius, BoundsError, Coordinates, ErrorKind};
use log::debug;
use thiserror::Error;

use crate::{CollabContext, DatabaseError, VenueData};

/// Read access to the study venues known to flashmob
pub struct VenueDirectory {
    context: CollabContext,
}

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("Venue not found")]
    NotFound,
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Database(DatabaseError),
}

impl VenueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VenueError::NotFound => ErrorKind::NotFound,
            VenueError::Bounds(_) => ErrorKind::Validation,
            VenueError::Database(e) => e.kind(),
        }
    }
}

impl From<DatabaseError> for VenueError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { .. } => VenueError::NotFound,
            e => VenueError::Database(e),
        }
    }
}

/// A venue along with how far away it is
#[derive(Debug, Clone)]
pub struct NearbyVenue {
    pub venue: VenueData,
    /// In miles
    pub distance: f64,
}

impl VenueDirectory {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn list_all(&self) -> Result<Vec<VenueData>, VenueError> {
        Ok(self.context.database.list_venues().await?)
    }

    pub async fn venue(&self, venue_id: &str) -> Result<VenueData, VenueError> {
        Ok(self.context.database.venue_by_id(venue_id).await?)
    }

    /// Returns the venues within `radius` miles of `point`, closest first
    pub async fn list_nearby(
        &self,
        point: Coordinates,
        radius: Option<f64>,
    ) -> Result<Vec<NearbyVenue>, VenueError> {
        let radius = validate_radius(radius.unwrap_or(self.context.config.default_search_radius))?;
        let venues = self.context.database.list_venues().await?;

        let nearby = nearby_venues(venues, point, radius);
        debug!(
            "Found {} venues within {} miles of {}, {}",
            nearby.len(),
            radius,
            point.lat,
            point.lng
        );

        Ok(nearby)
    }
}

pub fn nearby_venues(venues: Vec<VenueData>, point: Coordinates, radius: f64) -> Vec<NearbyVenue> {
    let mut nearby: Vec<_> = venues
        .into_iter()
        .map(|venue| NearbyVenue {
            distance: point.distance_to(&venue.coordinates),
            venue,
        })
        .filter(|v| v.distance <= radius)
        .collect();

    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}

#[cfg(test)]
mod test {
    use flashmob_core::Config;

    use crate::{Collab, MemoryDatabase};

    use super::*;

    const UCM: Coordinates = Coordinates::new(38.7625, -93.7344);

    #[tokio::test]
    async fn test_nearby_is_sorted_and_bounded() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());
        let nearby = collab.venues.list_nearby(UCM, Some(5.)).await.unwrap();

        let ids: Vec<_> = nearby.iter().map(|v| v.venue.id.as_str()).collect();
        assert_eq!(ids.len(), 5, "only the Warrensburg venues are within 5 miles");
        assert_eq!(ids[0], "V001");

        assert!(nearby.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(nearby.iter().all(|v| v.distance <= 5.));
    }

    #[tokio::test]
    async fn test_nearby_is_unbounded_in_count() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());
        let all = collab.venues.list_all().await.unwrap();
        let nearby = collab.venues.list_nearby(UCM, Some(500.)).await.unwrap();

        // Missouri, Kansas and Chicago, but not the coasts
        assert_eq!(nearby.len(), 16);
        assert!(nearby.len() < all.len());
        assert!(nearby.iter().any(|v| v.venue.id == "V020"));
        assert!(!nearby.iter().any(|v| v.venue.id == "V033"));
    }

    #[tokio::test]
    async fn test_venue_lookup() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());

        assert_eq!(
            collab.venues.venue("V006").await.unwrap().name,
            "Kansas City Public Library - Central"
        );
        assert_eq!(
            collab.venues.venue("V999").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            collab
                .venues
                .list_nearby(UCM, Some(-1.))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_nearby_includes_exact_radius() {
        let venues = seed_venues();
        let target = venues.iter().find(|v| v.id == "V002").unwrap().clone();
        let radius = UCM.distance_to(&target.coordinates);

        let nearby = nearby_venues(venues, UCM, radius);
        assert!(nearby.iter().any(|v| v.venue.id == "V002"));
    }
}
