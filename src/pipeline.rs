use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::clean::{self, AreaWindow, CleanReport};
use crate::db::{self, RunRow};
use crate::geo::{GeocodeStats, Geocoder, GeocodingCache};
use crate::jitter;
use crate::settings::Settings;
use crate::table::{self, Table};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Ignore persisted geocode entries.
    pub fresh: bool,
    pub retry_unresolved: bool,
    pub skip_geocode: bool,
    pub force: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: String,
    pub clean: CleanReport,
    pub geocode: Option<GeocodeStats>,
    pub geocoded: usize,
    pub projected: usize,
}

impl RunSummary {
    pub fn print(&self) {
        self.clean.print();
        match &self.geocode {
            Some(stats) => stats.print(),
            None => println!("Geocoding skipped."),
        }
        println!(
            "{} of {} rows geocoded, {} display positions.",
            self.geocoded, self.clean.rows_out, self.projected
        );
    }
}

pub enum RunOutcome {
    UpToDate(RunRow),
    Completed(RunSummary),
}

pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint of everything besides the input bytes that changes the written table.
pub fn options_fingerprint(settings: &Settings, opts: &RunOptions) -> String {
    let window = settings.area_window();
    let key = format!(
        "skip_geocode={};country={};jitter={};surface={}..{}",
        opts.skip_geocode, settings.country, settings.jitter_magnitude, window.min, window.max
    );
    fingerprint(key.as_bytes())
}

pub fn new_run_id() -> String {
    format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f"))
}

// ── Stages ──

pub fn clean_table(table: Table, window: AreaWindow) -> (Table, CleanReport) {
    let Table {
        extra_headers,
        has_url,
        records,
    } = table;
    let (records, report) = clean::clean(records, window);
    (
        Table {
            extra_headers,
            has_url,
            records,
        },
        report,
    )
}

/// Resolve every distinct place once, then copy positions onto the rows.
pub async fn geocode_table<G: Geocoder>(
    table: &mut Table,
    geocoder: &G,
    cache: &mut GeocodingCache,
) -> (GeocodeStats, usize) {
    let keys = GeocodingCache::unique_keys(&table.records);
    info!(unique = keys.len(), "Place keys to geocode");

    let pb = progress_bar(keys.len() as u64);
    let stats = cache.populate(geocoder, &keys, &pb).await;
    pb.finish_and_clear();

    let geocoded = cache.apply(&mut table.records);
    info!(geocoded, rows = table.records.len(), "Coordinates assigned");
    (stats, geocoded)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

// ── Full run ──

/// Clean, geocode and project `input` into `output`, recording the run in `conn`.
pub async fn run_with<G: Geocoder>(
    conn: &Connection,
    settings: &Settings,
    geocoder: &G,
    opts: RunOptions,
) -> Result<RunOutcome> {
    let input = settings.input.as_path();
    let output = settings.output.as_path();

    let bytes = fs::read(input).with_context(|| format!("Failed to read {:?}", input))?;
    let input_hash = fingerprint(&bytes);
    let options_hash = options_fingerprint(settings, &opts);
    // Cache refresh flags always mean a real run.
    if !(opts.force || opts.fresh || opts.retry_unresolved) {
        if let Some(last) = up_to_date(conn, &input_hash, &options_hash, output)? {
            return Ok(RunOutcome::UpToDate(last));
        }
    }

    let table = table::parse_table(&bytes).with_context(|| format!("Failed to parse {:?}", input))?;
    info!(rows = table.records.len(), path = ?input, "Loaded listings");
    let rows_in = table.records.len();

    let (mut table, clean_report) = clean_table(table, settings.area_window());

    let mut summary = RunSummary {
        run_id: new_run_id(),
        clean: clean_report,
        ..Default::default()
    };

    if !opts.skip_geocode {
        let mut cache = GeocodingCache::new(&settings.country, settings.request_delay());
        if !opts.fresh {
            cache = cache.with_entries(db::load_geocode_cache(conn)?);
            if opts.retry_unresolved {
                let dropped = cache.forget_unresolved();
                info!(dropped, "Retrying unresolved places");
            }
        }
        let (stats, geocoded) = geocode_table(&mut table, geocoder, &mut cache).await;
        let saved = db::save_geocode_cache(conn, &cache)?;
        info!(saved, "Geocode cache persisted");
        summary.geocode = Some(stats);
        summary.geocoded = geocoded;
    } else {
        for rec in table.records.iter_mut() {
            rec.coordinates = None;
        }
    }

    summary.projected = jitter::project_all(&mut table.records, settings.jitter_magnitude);

    table::save_table(output, &table)?;
    info!(rows = table.records.len(), path = ?output, "Wrote cleaned table");

    db::insert_run(
        conn,
        &RunRow {
            run_id: summary.run_id.clone(),
            input_hash,
            options_hash,
            output_path: output.display().to_string(),
            rows_in,
            rows_out: table.records.len(),
            geocoded: summary.geocoded,
            finished_at: Utc::now().to_rfc3339(),
        },
    )?;

    Ok(RunOutcome::Completed(summary))
}

fn up_to_date(
    conn: &Connection,
    input_hash: &str,
    options_hash: &str,
    output: &Path,
) -> Result<Option<RunRow>> {
    let last = db::last_run(conn)?;
    Ok(last.filter(|run| {
        run.input_hash == input_hash
            && run.options_hash == options_hash
            && run.output_path == output.display().to_string()
            && output.exists()
    }))
}
