pub mod cache;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod nominatim;
pub mod query;

use crate::listing::Coordinates;
pub use cache::{GeocodeOutcome, GeocodeStats, GeocodingCache};
pub use error::GeocodeError;
pub use nominatim::NominatimClient;

/// Place-name to coordinate lookup. `Ok(None)` means the service had no match.
pub trait Geocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;
}
