use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::geo::{GeocodeOutcome, GeocodingCache};
use crate::listing::{Coordinates, PlaceKey};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS geocode_cache (
            city          TEXT NOT NULL,
            division_name TEXT NOT NULL,
            latitude      REAL,
            longitude     REAL,
            resolved      BOOLEAN NOT NULL,
            cached_at     TEXT NOT NULL,
            PRIMARY KEY (city, division_name)
        );

        CREATE TABLE IF NOT EXISTS pipeline_runs (
            run_id       TEXT PRIMARY KEY,
            input_hash   TEXT NOT NULL,
            options_hash TEXT NOT NULL,
            output_path  TEXT NOT NULL,
            rows_in      INTEGER NOT NULL,
            rows_out     INTEGER NOT NULL,
            geocoded     INTEGER NOT NULL,
            finished_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_runs_finished ON pipeline_runs(finished_at);
        ",
    )?;
    Ok(())
}

// ── Geocode cache ──

pub fn load_geocode_cache(conn: &Connection) -> Result<HashMap<PlaceKey, GeocodeOutcome>> {
    let mut stmt = conn.prepare(
        "SELECT city, division_name, latitude, longitude, resolved FROM geocode_cache",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let key = PlaceKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?);
            let lat: Option<f64> = row.get(2)?;
            let lon: Option<f64> = row.get(3)?;
            let resolved: bool = row.get(4)?;
            let outcome = match (resolved, lat, lon) {
                (true, Some(lat), Some(lon)) => GeocodeOutcome::Resolved(Coordinates { lat, lon }),
                _ => GeocodeOutcome::Unresolved,
            };
            Ok((key, outcome))
        })?
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(rows)
}

pub fn save_geocode_cache(conn: &Connection, cache: &GeocodingCache) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO geocode_cache
             (city, division_name, latitude, longitude, resolved, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (key, outcome) in cache.iter() {
            if matches!(outcome, GeocodeOutcome::Failed) {
                continue;
            }
            let coords = outcome.coordinates();
            count += stmt.execute(rusqlite::params![
                key.city,
                key.division_name,
                coords.map(|c| c.lat),
                coords.map(|c| c.lon),
                coords.is_some(),
                now,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn clear_geocode_cache(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM geocode_cache", [])?)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

pub fn cache_stats(conn: &Connection) -> Result<CacheStats> {
    let stats = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(resolved), 0), MIN(cached_at), MAX(cached_at)
         FROM geocode_cache",
        [],
        |row| {
            let entries: i64 = row.get(0)?;
            let resolved: i64 = row.get(1)?;
            Ok(CacheStats {
                entries: entries as usize,
                resolved: resolved as usize,
                unresolved: (entries - resolved) as usize,
                oldest: row.get(2)?,
                newest: row.get(3)?,
            })
        },
    )?;
    Ok(stats)
}

// ── Runs ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRow {
    pub run_id: String,
    pub input_hash: String,
    /// Fingerprint of the options and settings that shape the output table.
    pub options_hash: String,
    pub output_path: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub geocoded: usize,
    pub finished_at: String,
}

pub fn insert_run(conn: &Connection, run: &RunRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO pipeline_runs
         (run_id, input_hash, options_hash, output_path, rows_in, rows_out, geocoded, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            run.run_id,
            run.input_hash,
            run.options_hash,
            run.output_path,
            run.rows_in as i64,
            run.rows_out as i64,
            run.geocoded as i64,
            run.finished_at,
        ],
    )?;
    Ok(())
}

pub fn last_run(conn: &Connection) -> Result<Option<RunRow>> {
    let row = conn
        .query_row(
            "SELECT run_id, input_hash, options_hash, output_path, rows_in, rows_out, geocoded, finished_at
             FROM pipeline_runs ORDER BY finished_at DESC, rowid DESC LIMIT 1",
            [],
            |row| {
                Ok(RunRow {
                    run_id: row.get(0)?,
                    input_hash: row.get(1)?,
                    options_hash: row.get(2)?,
                    output_path: row.get(3)?,
                    rows_in: row.get::<_, i64>(4)? as usize,
                    rows_out: row.get::<_, i64>(5)? as usize,
                    geocoded: row.get::<_, i64>(6)? as usize,
                    finished_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}
