/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Geocoding identity of a listing: one lookup per distinct pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceKey {
    pub city: String,
    pub division_name: String,
}

impl PlaceKey {
    pub fn new(city: impl Into<String>, division_name: impl Into<String>) -> Self {
        PlaceKey {
            city: city.into(),
            division_name: division_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceSource {
    Listing,
    Description,
}

impl SurfaceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceSource::Listing => "listing",
            SurfaceSource::Description => "description",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "listing" => Some(SurfaceSource::Listing),
            "description" => Some(SurfaceSource::Description),
            _ => None,
        }
    }
}

/// One row of the working table.
#[derive(Debug, Clone, Default)]
pub struct ListingRecord {
    /// Position in the input file; identity fallback when there is no URL.
    pub row_index: usize,
    pub url: Option<String>,
    pub price: Option<f64>,
    pub surface_m2: Option<f64>,
    pub surface_source: Option<SurfaceSource>,
    pub property_type: String,
    pub raw_location: String,
    pub description: String,
    pub division_code: String,
    pub city: String,
    pub division_name: String,
    pub price_per_area: Option<f64>,
    pub coordinates: Option<Coordinates>,
    pub display: Option<Coordinates>,
    /// Values of input columns the pipeline does not interpret, aligned
    /// with `Table::extra_headers`.
    pub extra: Vec<String>,
}

impl ListingRecord {
    pub fn place_key(&self) -> PlaceKey {
        PlaceKey::new(self.city.clone(), self.division_name.clone())
    }

    pub fn identity_key(&self) -> String {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => self.row_index.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_prefers_url() {
        let rec = ListingRecord {
            row_index: 7,
            url: Some("https://www.immobilier.notaires.fr/fr/annonce/123".into()),
            ..Default::default()
        };
        assert_eq!(rec.identity_key(), "https://www.immobilier.notaires.fr/fr/annonce/123");
    }

    #[test]
    fn identity_falls_back_to_row_index() {
        let blank = ListingRecord {
            row_index: 7,
            url: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(blank.identity_key(), "7");
        let missing = ListingRecord {
            row_index: 3,
            ..Default::default()
        };
        assert_eq!(missing.identity_key(), "3");
    }

    #[test]
    fn surface_source_labels() {
        for src in [SurfaceSource::Listing, SurfaceSource::Description] {
            assert_eq!(SurfaceSource::parse(src.as_str()), Some(src));
        }
        assert_eq!(SurfaceSource::parse("other"), None);
    }
}
