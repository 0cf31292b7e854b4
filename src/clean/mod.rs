pub mod location;
pub mod surface;

use std::collections::HashSet;

use tracing::info;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::listing::{ListingRecord, SurfaceSource};
use location::{normalize_division_code, parse_location};
use surface::extract_surface;

/// Surfaces (m²) for which a price per m² is computed.
#[derive(Debug, Clone, Copy)]
pub struct AreaWindow {
    pub min: f64,
    pub max: f64,
}

impl AreaWindow {
    pub fn contains(&self, surface: f64) -> bool {
        surface >= self.min && surface <= self.max
    }
}

impl Default for AreaWindow {
    fn default() -> Self {
        AreaWindow {
            min: 15.0,
            max: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rows_in: usize,
    pub surface_missing: usize,
    pub surface_recovered: usize,
    pub dropped_no_surface: usize,
    pub dropped_no_price: usize,
    pub rows_out: usize,
    pub unique_cities: usize,
    pub price_per_area_null: usize,
}

impl CleanReport {
    pub fn print(&self) {
        println!(
            "Cleaned {} -> {} rows ({} surfaces recovered of {} missing, dropped {} without surface, {} without price).",
            self.rows_in,
            self.rows_out,
            self.surface_recovered,
            self.surface_missing,
            self.dropped_no_surface,
            self.dropped_no_price,
        );
        println!(
            "  {} unique cities, {} rows outside the price/m² window.",
            self.unique_cities, self.price_per_area_null
        );
    }
}

/// Run every cleaning pass in order. The result depends only on the input rows.
pub fn clean(mut records: Vec<ListingRecord>, window: AreaWindow) -> (Vec<ListingRecord>, CleanReport) {
    let mut report = CleanReport {
        rows_in: records.len(),
        ..Default::default()
    };

    pass_recover_surface(&mut records, &mut report);
    pass_drop_incomplete(&mut records, &mut report);
    pass_split_location(&mut records, &mut report);
    pass_division_code(&mut records);
    pass_price_per_area(&mut records, window, &mut report);

    report.rows_out = records.len();
    info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        "Cleaning finished"
    );
    (records, report)
}

pub fn pass_recover_surface(records: &mut [ListingRecord], report: &mut CleanReport) {
    for rec in records.iter_mut() {
        if rec.surface_m2.is_some() && rec.surface_source.is_none() {
            rec.surface_source = Some(SurfaceSource::Listing);
        }
    }
    report.surface_missing = records.iter().filter(|r| r.surface_m2.is_none()).count();

    let recovered = recover_surfaces(records);
    let mut count = 0;
    for (rec, surface) in records.iter_mut().zip(recovered) {
        if let Some(s) = surface {
            rec.surface_m2 = Some(s);
            rec.surface_source = Some(SurfaceSource::Description);
            count += 1;
        }
    }
    report.surface_recovered = count;
    info!(
        missing = report.surface_missing,
        recovered = count,
        "Surface recovery"
    );
}

#[cfg(feature = "rayon")]
fn recover_surfaces(records: &[ListingRecord]) -> Vec<Option<f64>> {
    records.par_iter().map(recover_one).collect()
}

#[cfg(not(feature = "rayon"))]
fn recover_surfaces(records: &[ListingRecord]) -> Vec<Option<f64>> {
    records.iter().map(recover_one).collect()
}

fn recover_one(rec: &ListingRecord) -> Option<f64> {
    if rec.surface_m2.is_some() {
        return None;
    }
    let hint = Some(rec.property_type.as_str()).filter(|t| !t.trim().is_empty());
    extract_surface(&rec.description, hint).filter(|s| *s > 0.0)
}

pub fn pass_drop_incomplete(records: &mut Vec<ListingRecord>, report: &mut CleanReport) {
    let before = records.len();
    records.retain(|r| r.surface_m2.is_some());
    report.dropped_no_surface = before - records.len();

    let before = records.len();
    records.retain(|r| r.price.is_some());
    report.dropped_no_price = before - records.len();

    info!(
        dropped_no_surface = report.dropped_no_surface,
        dropped_no_price = report.dropped_no_price,
        remaining = records.len(),
        "Dropped incomplete rows"
    );
}

pub fn pass_split_location(records: &mut [ListingRecord], report: &mut CleanReport) {
    for rec in records.iter_mut() {
        let parsed = parse_location(&rec.raw_location);
        rec.city = parsed.city;
        rec.division_name = parsed.division_name;
        if rec.division_code.trim().is_empty() {
            if let Some(code) = parsed.division_code {
                rec.division_code = code;
            }
        }
    }
    report.unique_cities = records
        .iter()
        .map(|r| r.city.as_str())
        .collect::<HashSet<_>>()
        .len();
}

pub fn pass_division_code(records: &mut [ListingRecord]) {
    for rec in records.iter_mut() {
        rec.division_code = normalize_division_code(&rec.division_code);
    }
}

pub fn pass_price_per_area(records: &mut [ListingRecord], window: AreaWindow, report: &mut CleanReport) {
    for rec in records.iter_mut() {
        rec.price_per_area = match (rec.price, rec.surface_m2) {
            (Some(price), Some(surface)) if window.contains(surface) => {
                Some(round2(price / surface))
            }
            _ => None,
        };
    }
    report.price_per_area_null = records.iter().filter(|r| r.price_per_area.is_none()).count();
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: usize, price: Option<f64>, surface: Option<f64>, desc: &str) -> ListingRecord {
        ListingRecord {
            row_index: idx,
            price,
            surface_m2: surface,
            property_type: "Appartement T3".into(),
            raw_location: "- Lyon 3 - Rhône (69)".into(),
            description: desc.into(),
            ..Default::default()
        }
    }

    #[test]
    fn recovers_then_drops() {
        let rows = vec![
            row(0, Some(300_000.0), Some(60.0), ""),
            row(1, Some(250_000.0), None, "Appartement de 52 m² lumineux"),
            row(2, Some(200_000.0), None, "Aucune surface indiquée"),
            row(3, None, Some(40.0), ""),
        ];
        let (out, report) = clean(rows, AreaWindow::default());
        assert_eq!(report.rows_in, 4);
        assert_eq!(report.surface_missing, 2);
        assert_eq!(report.surface_recovered, 1);
        assert_eq!(report.dropped_no_surface, 1);
        assert_eq!(report.dropped_no_price, 1);
        assert_eq!(report.rows_out, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].surface_source, Some(SurfaceSource::Listing));
        assert_eq!(out[1].surface_m2, Some(52.0));
        assert_eq!(out[1].surface_source, Some(SurfaceSource::Description));
        assert!(out.iter().all(|r| r.price.is_some() && r.surface_m2.is_some()));
    }

    #[test]
    fn splits_location_and_fills_code() {
        let mut r = row(0, Some(1.0), Some(50.0), "");
        r.raw_location = "- Tarascon - Bouches-du-Rhône (13)".into();
        let mut with_code = row(1, Some(1.0), Some(50.0), "");
        with_code.division_code = "6".into();
        let (out, report) = clean(vec![r, with_code], AreaWindow::default());
        assert_eq!(out[0].city, "Tarascon");
        assert_eq!(out[0].division_name, "Bouches-du-Rhône");
        assert_eq!(out[0].division_code, "13");
        assert_eq!(out[1].division_code, "06");
        assert_eq!(report.unique_cities, 2);
    }

    #[test]
    fn price_per_area_window() {
        let rows = vec![
            row(0, Some(300_000.0), Some(60.0), ""),
            row(1, Some(90_000.0), Some(12.0), ""),
            row(2, Some(2_000_000.0), Some(1500.0), ""),
            row(3, Some(100_000.0), Some(15.0), ""),
            row(4, Some(1_000_000.0), Some(1000.0), ""),
            row(5, Some(100_000.0), Some(30.0), ""),
        ];
        let (out, report) = clean(rows, AreaWindow::default());
        assert_eq!(out[0].price_per_area, Some(5000.0));
        assert_eq!(out[1].price_per_area, None);
        assert_eq!(out[2].price_per_area, None);
        assert_eq!(out[3].price_per_area, Some(6666.67));
        assert_eq!(out[4].price_per_area, Some(1000.0));
        assert_eq!(out[5].price_per_area, Some(3333.33));
        assert_eq!(report.price_per_area_null, 2);
    }

    #[test]
    fn studio_hint_uses_lower_threshold() {
        let mut r = row(0, Some(95_000.0), None, "Studio d'environ 14 m² refait à neuf");
        r.property_type = "Appartement T1".into();
        let (out, _) = clean(vec![r], AreaWindow::default());
        assert_eq!(out[0].surface_m2, Some(14.0));
        assert_eq!(out[0].price_per_area, None);
    }

    #[test]
    fn cleaning_is_deterministic() {
        let rows = || {
            vec![
                row(0, Some(300_000.0), None, "Appartement de 75 m², cave 6 m²"),
                row(1, Some(120_000.0), None, "Maison d'environ 95 m²"),
            ]
        };
        let (a, ra) = clean(rows(), AreaWindow::default());
        let (b, rb) = clean(rows(), AreaWindow::default());
        assert_eq!(ra, rb);
        let surfaces = |v: &[ListingRecord]| v.iter().map(|r| r.surface_m2).collect::<Vec<_>>();
        assert_eq!(surfaces(&a), surfaces(&b));
    }
}
