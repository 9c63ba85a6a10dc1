mod access;
mod auth;
mod db;
mod geocoding;
mod messages;
mod sessions;
mod users;
mod util;
mod venues;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use access::*;
pub use auth::*;
pub use db::*;
pub use geocoding::*;
pub use messages::*;
pub use sessions::*;
pub use users::*;
pub use venues::*;

use flashmob_core::Config;

/// The flashmob collab system, facilitating sessions, join requests, messaging, and authentication.
pub struct Collab {
    pub auth: Auth,
    pub users: UserManager,
    pub sessions: SessionManager,
    pub requests: JoinRequests,
    pub venues: VenueDirectory,
    pub messages: MessageLog,
}

/// A type passed to the components of the collab system, to access shared state.
#[derive(Clone)]
pub struct CollabContext {
    pub config: Arc<Config>,
    pub database: Arc<dyn Database>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Serializes writes to the same session
    pub locks: Arc<SessionLocks>,
}

impl Collab {
    pub fn new<Db>(config: Config, database: Db) -> Self
    where
        Db: Database + 'static,
    {
        Self::with_geocoder(config, database, CityGeocoder)
    }

    pub fn with_geocoder<Db, G>(config: Config, database: Db, geocoder: G) -> Self
    where
        Db: Database + 'static,
        G: Geocoder + 'static,
    {
        let context = CollabContext {
            config: Arc::new(config),
            database: Arc::new(database),
            geocoder: Arc::new(geocoder),
            locks: Default::default(),
        };

        Self {
            auth: Auth::new(&context),
            users: UserManager::new(&context),
            sessions: SessionManager::new(&context),
            requests: JoinRequests::new(&context),
            venues: VenueDirectory::new(&context),
            messages: MessageLog::new(&context),
        }
    }
}
