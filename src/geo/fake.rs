use std::cell::RefCell;
use std::collections::HashMap;

use tokio::time::Instant;

use super::{GeocodeError, Geocoder};
use crate::listing::Coordinates;

/// In-memory geocoder that records every query it receives.
#[derive(Default)]
pub struct FakeGeocoder {
    known: HashMap<String, Coordinates>,
    failing: Vec<String>,
    calls: RefCell<Vec<(String, Instant)>>,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, query: &str, lat: f64, lon: f64) -> Self {
        self.known.insert(query.to_string(), Coordinates { lat, lon });
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.borrow().iter().map(|(_, t)| *t).collect()
    }
}

impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.calls
            .borrow_mut()
            .push((query.to_string(), Instant::now()));
        if self.failing.iter().any(|q| q == query) {
            return Err(GeocodeError::Status(503));
        }
        Ok(self.known.get(query).copied())
    }
}
