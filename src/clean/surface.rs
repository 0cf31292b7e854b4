use std::sync::LazyLock;

use regex::Regex;

// Number with optional decimal part, comma or point.
const NUM: &str = r"(\d+(?:[.,]\d+)?)";

static CARREZ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i){NUM}\s*m[²2]\s*(?:loi\s+)?carrez")).unwrap()
});
static HABITABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*m[²2]\s*habitables?")).unwrap());
static PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:d['’]une\s+surface\s+de|d['’]environ|de)\s*{NUM}\s*m[²2]"
    ))
    .unwrap()
});
static AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*m[²2]")).unwrap());
static ABOUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)environ\s*(\d+)").unwrap());
static STUDIO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[tf][01]\b|studio").unwrap());

/// Smallest plausible main area for a studio / one-room unit.
pub const STUDIO_MIN_SURFACE: f64 = 12.0;
/// Smallest plausible main area otherwise; balconies and cellars sit below it.
pub const DEFAULT_MIN_SURFACE: f64 = 25.0;

/// Threshold applied to the phrase, maximum and "environ" rules.
pub fn min_surface_for(property_type: Option<&str>) -> f64 {
    match property_type {
        Some(t) if STUDIO_RE.is_match(t) => STUDIO_MIN_SURFACE,
        _ => DEFAULT_MIN_SURFACE,
    }
}

/// Recover the floor area in m² from a free-text description.
///
/// Rules are tried in order and the first hit wins:
/// 1. `N m² carrez` (returned as is)
/// 2. `N m² habitable(s)` (returned as is)
/// 3. `de / d'environ / d'une surface de N m²` when N clears the threshold
/// 4. largest `N m²` clearing the threshold, else the largest `N m²` at all
/// 5. `environ N` without a unit when N clears the threshold
pub fn extract_surface(description: &str, property_type: Option<&str>) -> Option<f64> {
    let threshold = min_surface_for(property_type);

    if let Some(v) = first_capture(&CARREZ_RE, description) {
        return Some(v);
    }
    if let Some(v) = first_capture(&HABITABLE_RE, description) {
        return Some(v);
    }
    if let Some(v) = first_capture(&PHRASE_RE, description) {
        if v >= threshold {
            return Some(v);
        }
    }

    let areas: Vec<f64> = AREA_RE
        .captures_iter(description)
        .filter_map(|c| parse_number(&c[1]))
        .collect();
    if !areas.is_empty() {
        let above = areas.iter().copied().filter(|v| *v >= threshold).fold(None, max_opt);
        // Everything under the threshold: keep the largest anyway.
        return above.or_else(|| areas.iter().copied().fold(None, max_opt));
    }

    first_capture(&ABOUT_RE, description).filter(|v| *v >= threshold)
}

/// Parse `72,12` or `72.12`.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse::<f64>().ok()
}

fn first_capture(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text).and_then(|c| parse_number(&c[1]))
}

fn max_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}
