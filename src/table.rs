use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::listing::{Coordinates, ListingRecord, SurfaceSource};

// ── Column identifiers shared with the scraper and the dashboard ──

pub const URL: &str = "URL";
pub const PRICE: &str = "Prix";
pub const SURFACE: &str = "Surface_m2";
pub const PROPERTY_TYPE: &str = "Type_Bien";
pub const LOCATION: &str = "Localisation";
pub const DESCRIPTION: &str = "Description";
pub const DIVISION_CODE: &str = "Departement";

pub const SURFACE_SOURCE: &str = "Surface_source";
pub const CITY: &str = "Ville";
pub const DIVISION_NAME: &str = "Nom_Departement";
pub const PRICE_PER_AREA: &str = "prix_m2";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const LAT_VIZ: &str = "lat_viz";
pub const LON_VIZ: &str = "lon_viz";

const REQUIRED: &[&str] = &[PRICE, SURFACE, PROPERTY_TYPE, LOCATION, DESCRIPTION, DIVISION_CODE];
const INPUT: &[&str] = &[URL, PRICE, SURFACE, PROPERTY_TYPE, LOCATION, DESCRIPTION, DIVISION_CODE];
const DERIVED: &[&str] = &[
    SURFACE_SOURCE,
    CITY,
    DIVISION_NAME,
    PRICE_PER_AREA,
    LATITUDE,
    LONGITUDE,
    LAT_VIZ,
    LON_VIZ,
];

/// Parsed listing table plus the columns carried through untouched.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub extra_headers: Vec<String>,
    pub has_url: bool,
    pub records: Vec<ListingRecord>,
}

/// `;` when the header row has more semicolons than commas, else `,`.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let semis = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semis > commas {
        b';'
    } else {
        b','
    }
}

pub fn read_table(path: &Path) -> Result<Table> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    parse_table(&bytes).with_context(|| format!("Failed to parse {:?}", path))
}

pub fn parse_table(bytes: &[u8]) -> Result<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = detect_delimiter(&String::from_utf8_lossy(first_line));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }

    let col = |name: &str| headers.iter().position(|h| h == name);
    let extra_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !INPUT.contains(&h.as_str()) && !DERIVED.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut records = Vec::new();
    for (row_index, row) in reader.records().enumerate() {
        let row = row?;
        let cell = |name: &str| field(&row, col(name)).to_string();
        let number = |name: &str| parse_plain(field(&row, col(name)));

        let coordinates = match (number(LATITUDE), number(LONGITUDE)) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        };
        let display = match (number(LAT_VIZ), number(LON_VIZ)) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        };

        records.push(ListingRecord {
            row_index,
            url: Some(cell(URL)).filter(|u| !u.is_empty()),
            price: parse_amount(field(&row, col(PRICE))),
            surface_m2: parse_amount(field(&row, col(SURFACE))),
            surface_source: SurfaceSource::parse(field(&row, col(SURFACE_SOURCE))),
            property_type: cell(PROPERTY_TYPE),
            raw_location: cell(LOCATION),
            description: cell(DESCRIPTION),
            division_code: cell(DIVISION_CODE),
            city: cell(CITY),
            division_name: cell(DIVISION_NAME),
            price_per_area: number(PRICE_PER_AREA),
            coordinates,
            display,
            extra: extra_idx
                .iter()
                .map(|i| row.get(*i).unwrap_or("").to_string())
                .collect(),
        });
    }

    Ok(Table {
        extra_headers: extra_idx.iter().map(|i| headers[*i].clone()).collect(),
        has_url: col(URL).is_some(),
        records,
    })
}

/// Positive amount from a scraped cell: `250 000 €`, `72,5`, `1500.0`.
/// Zero and negative values count as missing.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn field(row: &csv::StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).unwrap_or("").trim()
}

fn parse_plain(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

pub fn write_table<W: Write>(out: W, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = table.extra_headers.iter().map(String::as_str).collect();
    if table.has_url {
        header.push(URL);
    }
    header.extend(&INPUT[1..]);
    header.extend(DERIVED);
    writer.write_record(&header)?;

    for r in &table.records {
        let mut row: Vec<String> = r.extra.clone();
        if table.has_url {
            row.push(r.url.clone().unwrap_or_default());
        }
        row.extend([
            fmt_opt(r.price),
            fmt_opt(r.surface_m2),
            r.property_type.clone(),
            r.raw_location.clone(),
            r.description.clone(),
            r.division_code.clone(),
            r.surface_source.map(|s| s.as_str().to_string()).unwrap_or_default(),
            r.city.clone(),
            r.division_name.clone(),
            fmt_opt(r.price_per_area),
            fmt_opt(r.coordinates.map(|c| c.lat)),
            fmt_opt(r.coordinates.map(|c| c.lon)),
            fmt_opt(r.display.map(|c| c.lat)),
            fmt_opt(r.display.map(|c| c.lon)),
        ]);
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write through a temporary sibling and rename, so a failure leaves no partial file.
pub fn save_table(path: &Path, table: &Table) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let tmp = path.with_extension("csv.tmp");
    let file = fs::File::create(&tmp).with_context(|| format!("Failed to create {:?}", tmp))?;
    write_table(file, table)?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move output to {:?}", path))?;
    Ok(())
}
