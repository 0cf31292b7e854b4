use std::collections::{HashMap, HashSet};
use std::time::Duration;

use indicatif::ProgressBar;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

use super::query::build_query;
use super::Geocoder;
use crate::listing::{Coordinates, ListingRecord, PlaceKey};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeocodeOutcome {
    Resolved(Coordinates),
    /// Known to have no usable answer; not looked up again this run.
    Unresolved,
    /// The lookup itself errored. Skipped for the rest of the run, never persisted.
    Failed,
}

impl GeocodeOutcome {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            GeocodeOutcome::Resolved(c) => Some(*c),
            GeocodeOutcome::Unresolved | GeocodeOutcome::Failed => None,
        }
    }
}

/// Enforces a minimum gap between the end of one call and the start of the next.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last_call: None,
        }
    }

    pub async fn ready(&self) {
        if let Some(last) = self.last_call {
            sleep_until(last + self.min_interval).await;
        }
    }

    pub fn mark(&mut self) {
        self.last_call = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodeStats {
    pub unique_keys: usize,
    pub cached: usize,
    pub lookups: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub failed: usize,
}

impl GeocodeStats {
    pub fn print(&self) {
        println!(
            "Geocoded {} places ({} cached, {} lookups: {} resolved, {} not found, {} failed).",
            self.unique_keys, self.cached, self.lookups, self.resolved, self.unresolved, self.failed
        );
    }
}

/// One lookup per distinct (city, division) pair, run sequentially behind a rate limiter.
pub struct GeocodingCache {
    entries: HashMap<PlaceKey, GeocodeOutcome>,
    limiter: RateLimiter,
    country: String,
}

impl GeocodingCache {
    pub fn new(country: &str, min_delay: Duration) -> Self {
        GeocodingCache {
            entries: HashMap::new(),
            limiter: RateLimiter::new(min_delay),
            country: country.to_string(),
        }
    }

    /// Seed with entries persisted by an earlier run.
    pub fn with_entries(mut self, entries: HashMap<PlaceKey, GeocodeOutcome>) -> Self {
        self.entries.extend(entries);
        self
    }

    pub fn get(&self, key: &PlaceKey) -> Option<&GeocodeOutcome> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlaceKey, &GeocodeOutcome)> {
        self.entries.iter()
    }

    /// Drop unresolved and failed markers so the next `populate` retries them.
    pub fn forget_unresolved(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, outcome| matches!(outcome, GeocodeOutcome::Resolved(_)));
        before - self.entries.len()
    }

    /// Distinct place keys in first-seen order.
    pub fn unique_keys(records: &[ListingRecord]) -> Vec<PlaceKey> {
        let mut seen = HashSet::new();
        records
            .iter()
            .map(ListingRecord::place_key)
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }

    /// Resolve every key not already cached. Lookup failures are recorded as
    /// failed and never abort the loop.
    pub async fn populate<G: Geocoder>(
        &mut self,
        geocoder: &G,
        keys: &[PlaceKey],
        pb: &ProgressBar,
    ) -> GeocodeStats {
        let mut stats = GeocodeStats {
            unique_keys: keys.len(),
            ..Default::default()
        };

        for key in keys {
            pb.inc(1);
            if self.entries.contains_key(key) {
                stats.cached += 1;
                continue;
            }
            if key.city.trim().is_empty() {
                stats.unresolved += 1;
                self.entries.insert(key.clone(), GeocodeOutcome::Unresolved);
                continue;
            }

            let query = build_query(&key.city, &key.division_name, &self.country);
            self.limiter.ready().await;
            let result = geocoder.geocode(&query).await;
            self.limiter.mark();
            stats.lookups += 1;

            let outcome = match result {
                Ok(Some(c)) => {
                    stats.resolved += 1;
                    GeocodeOutcome::Resolved(c)
                }
                Ok(None) => {
                    warn!(city = %key.city, division = %key.division_name, %query, "Place not found");
                    stats.unresolved += 1;
                    GeocodeOutcome::Unresolved
                }
                Err(e) => {
                    warn!(city = %key.city, division = %key.division_name, error = %e, "Lookup failed");
                    stats.failed += 1;
                    GeocodeOutcome::Failed
                }
            };
            self.entries.insert(key.clone(), outcome);
        }

        info!(
            unique = stats.unique_keys,
            lookups = stats.lookups,
            resolved = stats.resolved,
            "Geocoding pass finished"
        );
        stats
    }

    /// Copy cached coordinates onto every record; returns how many got a position.
    pub fn apply(&self, records: &mut [ListingRecord]) -> usize {
        let mut geocoded = 0;
        for rec in records.iter_mut() {
            rec.coordinates = self
                .get(&rec.place_key())
                .and_then(GeocodeOutcome::coordinates);
            if rec.coordinates.is_some() {
                geocoded += 1;
            }
        }
        geocoded
    }
}
