use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::clean::AreaWindow;

/// Runtime settings: defaults, then optional `immo.{toml,json,yaml}`, then `IMMO_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub cache_db: PathBuf,
    pub nominatim_url: String,
    pub user_agent: String,
    pub country: String,
    pub request_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub jitter_magnitude: f64,
    pub min_plausible_surface: f64,
    pub max_plausible_surface: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input: PathBuf::from("data/annonces_raw.csv"),
            output: PathBuf::from("data/annonces_clean.csv"),
            cache_db: PathBuf::from("data/geocode_cache.sqlite"),
            nominatim_url: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: "immo_pipeline".into(),
            country: "France".into(),
            request_delay_ms: 1000,
            request_timeout_secs: 10,
            jitter_magnitude: 0.004,
            min_plausible_surface: 15.0,
            max_plausible_surface: 1000.0,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(config::File::with_name("immo").required(false))
            .add_source(config::Environment::with_prefix("IMMO").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Invalid configuration")
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn area_window(&self) -> AreaWindow {
        AreaWindow {
            min: self.min_plausible_surface,
            max: self.max_plausible_surface,
        }
    }
}
