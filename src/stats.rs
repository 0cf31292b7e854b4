use std::collections::BTreeMap;

use crate::listing::ListingRecord;

pub const DEFAULT_TOP: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct DivisionRow {
    pub code: String,
    pub name: String,
    pub median_price_per_area: f64,
    pub listings: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSummary {
    pub listings: usize,
    pub geocoded: usize,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_mean: Option<f64>,
    pub price_median: Option<f64>,
    pub price_per_area_mean: Option<f64>,
    pub price_per_area_median: Option<f64>,
    pub top_divisions: Vec<DivisionRow>,
}

impl MarketSummary {
    pub fn from_records(records: &[ListingRecord], top: usize) -> Self {
        let prices: Vec<f64> = records.iter().filter_map(|r| r.price).collect();
        let per_area: Vec<f64> = records.iter().filter_map(|r| r.price_per_area).collect();

        MarketSummary {
            listings: records.len(),
            geocoded: records.iter().filter(|r| r.coordinates.is_some()).count(),
            price_min: prices.iter().copied().reduce(f64::min),
            price_max: prices.iter().copied().reduce(f64::max),
            price_mean: mean(&prices),
            price_median: median(&prices),
            price_per_area_mean: mean(&per_area),
            price_per_area_median: median(&per_area),
            top_divisions: top_divisions(records, top),
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("## Market Summary\n");
        out.push_str(&format!(
            "- Listings: {}\n- Geocoded: {} ({:.1}%)\n",
            self.listings,
            self.geocoded,
            percent(self.geocoded, self.listings)
        ));

        out.push_str("\n### Price (€)\n");
        out.push_str(&format!(
            "- Min: {}\n- Max: {}\n- Mean: {}\n- Median: {}\n",
            euros(self.price_min),
            euros(self.price_max),
            euros(self.price_mean),
            euros(self.price_median)
        ));

        out.push_str("\n### Price per m² (€/m²)\n");
        out.push_str(&format!(
            "- Mean: {}\n- Median: {}\n",
            euros(self.price_per_area_mean),
            euros(self.price_per_area_median)
        ));

        out.push_str(&format!(
            "\n### Top {} departments by median price per m²\n",
            self.top_divisions.len()
        ));
        if self.top_divisions.is_empty() {
            out.push_str("- (none)\n");
        }
        for (i, d) in self.top_divisions.iter().enumerate() {
            let label = if d.name.is_empty() {
                d.code.clone()
            } else {
                format!("{} {}", d.code, d.name)
            };
            out.push_str(&format!(
                "{}. {}: {:.0} €/m² ({} listings)\n",
                i + 1,
                label,
                d.median_price_per_area,
                d.listings
            ));
        }
        out
    }
}

/// Divisions ranked by median price per m², highest first; ties broken by code.
fn top_divisions(records: &[ListingRecord], top: usize) -> Vec<DivisionRow> {
    let mut groups: BTreeMap<&str, (&str, Vec<f64>)> = BTreeMap::new();
    for r in records {
        let Some(ppa) = r.price_per_area else { continue };
        let entry = groups
            .entry(r.division_code.as_str())
            .or_insert((r.division_name.as_str(), Vec::new()));
        if entry.0.is_empty() {
            entry.0 = r.division_name.as_str();
        }
        entry.1.push(ppa);
    }

    let mut rows: Vec<DivisionRow> = groups
        .into_iter()
        .filter_map(|(code, (name, values))| {
            Some(DivisionRow {
                code: code.to_string(),
                name: name.to_string(),
                median_price_per_area: median(&values)?,
                listings: values.len(),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.median_price_per_area
            .total_cmp(&a.median_price_per_area)
            .then_with(|| a.code.cmp(&b.code))
    });
    rows.truncate(top);
    rows
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn euros(v: Option<f64>) -> String {
    v.map(|x| format!("{:.0}", x)).unwrap_or_else(|| "n/a".into())
}
