use std::sync::LazyLock;

use regex::Regex;

static ARRONDISSEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(paris|lyon|marseille)\s*0*(\d{1,2})(?:er|e|ème|eme)?(?:\s+arrondissement)?\s*$").unwrap()
});

/// (city, postal code base, number of arrondissements)
const ARRONDISSEMENT_CITIES: &[(&str, u32, u32)] = &[
    ("paris", 75000, 20),
    ("lyon", 69000, 9),
    ("marseille", 13000, 16),
];

/// Postal code for `Paris 8`, `Lyon 03`, `Marseille 13e`, ...
pub fn arrondissement_postcode(city: &str) -> Option<u32> {
    let caps = ARRONDISSEMENT_RE.captures(city.trim())?;
    let name = caps[1].to_lowercase();
    let number: u32 = caps[2].parse().ok()?;
    let (_, base, count) = ARRONDISSEMENT_CITIES.iter().find(|(n, _, _)| *n == name)?;
    (1..=*count).contains(&number).then_some(base + number)
}

/// Free-text lookup query for a (city, division) pair.
pub fn build_query(city: &str, division_name: &str, country: &str) -> String {
    if let Some(cp) = arrondissement_postcode(city) {
        return format!("{:05}, {}", cp, country);
    }
    let city = city.trim();
    let division = division_name.trim();
    if division.is_empty() {
        format!("{}, {}", city, country)
    } else {
        format!("{}, {}, {}", city, division, country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paris_arrondissement_uses_postcode() {
        assert_eq!(build_query("Paris 8", "", "France"), "75008, France");
        assert_eq!(build_query("Paris 8", "Paris", "France"), "75008, France");
    }

    #[test]
    fn arrondissement_variants() {
        assert_eq!(arrondissement_postcode("Paris 08"), Some(75008));
        assert_eq!(arrondissement_postcode("PARIS20"), Some(75020));
        assert_eq!(arrondissement_postcode("Lyon 3e"), Some(69003));
        assert_eq!(arrondissement_postcode("marseille 13"), Some(13013));
        assert_eq!(arrondissement_postcode("Paris 1er"), Some(75001));
        assert_eq!(arrondissement_postcode("Paris 16ème Arrondissement"), Some(75016));
    }

    #[test]
    fn out_of_range_arrondissement_is_plain_city() {
        assert_eq!(arrondissement_postcode("Lyon 12"), None);
        assert_eq!(arrondissement_postcode("Paris 0"), None);
        assert_eq!(arrondissement_postcode("Paris 123"), None);
        assert_eq!(arrondissement_postcode("Lyon 1000"), None);
        assert_eq!(build_query("Paris 123", "Paris", "France"), "Paris 123, Paris, France");
        assert_eq!(build_query("Lyon 12", "Rhône", "France"), "Lyon 12, Rhône, France");
    }

    #[test]
    fn plain_city_is_not_arrondissement() {
        assert_eq!(arrondissement_postcode("Paris"), None);
        assert_eq!(arrondissement_postcode("Cormeilles-en-Parisis"), None);
        assert_eq!(build_query("Paris", "Paris", "France"), "Paris, Paris, France");
    }

    #[test]
    fn division_disambiguates() {
        assert_eq!(
            build_query("Tarascon", "Bouches-du-Rhône", "France"),
            "Tarascon, Bouches-du-Rhône, France"
        );
        assert_eq!(build_query("Tarascon", "", "France"), "Tarascon, France");
    }
}
