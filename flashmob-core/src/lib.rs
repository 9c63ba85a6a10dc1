//! Pure building blocks of flashmob: geography, session lifecycle rules, and check-in timing.
//! Nothing in here does IO.

mod bounds;
mod checkin;
mod config;
mod error;
mod geo;
mod status;
mod util;

pub use bounds::*;
pub use checkin::*;
pub use config::*;
pub use error::*;
pub use geo::*;
pub use status::*;
pub use util::*;
