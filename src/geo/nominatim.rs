use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{GeocodeError, Geocoder};
use crate::listing::Coordinates;

/// Client for an OpenStreetMap Nominatim `/search` endpoint.
pub struct NominatimClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimClient {
    pub fn new(endpoint: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(NominatimClient {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_search_response(&body)
    }
}

/// First hit of a `format=json` search answer; an empty array is no match.
pub fn parse_search_response(body: &str) -> Result<Option<Coordinates>, GeocodeError> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };
    let lat = parse_degrees(&hit.lat)?;
    let lon = parse_degrees(&hit.lon)?;
    debug!(place = hit.display_name.as_deref().unwrap_or(""), lat, lon, "Nominatim hit");
    Ok(Some(Coordinates { lat, lon }))
}

fn parse_degrees(raw: &str) -> Result<f64, GeocodeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeocodeError::BadCoordinate(raw.to_string()))
}
