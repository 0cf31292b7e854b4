/// City and division parsed from a `- City - Division (code)` location cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLocation {
    pub city: String,
    pub division_name: String,
    /// Parenthesised suffix, e.g. `13` in `Bouches-du-Rhône (13)`.
    pub division_code: Option<String>,
}

const SEPARATOR: &str = " - ";

/// Split a raw location. Malformed input degrades to a city-only parse.
pub fn parse_location(raw: &str) -> ParsedLocation {
    let text = raw
        .trim_start_matches(|c: char| c == '-' || c.is_whitespace())
        .trim();

    let Some((city, rest)) = text.split_once(SEPARATOR) else {
        return ParsedLocation {
            city: text.to_string(),
            ..Default::default()
        };
    };

    // Only the segment right after the city names the division.
    let segment = rest.split(SEPARATOR).next().unwrap_or(rest);
    let division_name = segment.split('(').next().unwrap_or(segment).trim();
    let division_code = rest.rsplit_once('(').and_then(|(_, tail)| {
        tail.split(')')
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    });

    ParsedLocation {
        city: city.trim().to_string(),
        division_name: division_name.to_string(),
        division_code,
    }
}

/// Fixed-width division code: `6` → `06`, `6.0` → `06`, `2A` and `974` unchanged.
pub fn normalize_division_code(raw: &str) -> String {
    let code = raw.trim();
    let code = code.strip_suffix(".0").unwrap_or(code);
    if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>2}", code)
    } else {
        code.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_and_division() {
        let p = parse_location("- Tarascon - Bouches-du-Rhône (13)");
        assert_eq!(p.city, "Tarascon");
        assert_eq!(p.division_name, "Bouches-du-Rhône");
        assert_eq!(p.division_code.as_deref(), Some("13"));
    }

    #[test]
    fn arrondissement_city() {
        let p = parse_location("- Paris 8 - Paris (75)");
        assert_eq!(p.city, "Paris 8");
        assert_eq!(p.division_name, "Paris");
    }

    #[test]
    fn extra_whitespace_and_dashes() {
        let p = parse_location("  --  Lyon - Rhône (69)  ");
        assert_eq!(p.city, "Lyon");
        assert_eq!(p.division_name, "Rhône");
    }

    #[test]
    fn no_separator_is_city_only() {
        let p = parse_location("- Grenoble");
        assert_eq!(p.city, "Grenoble");
        assert!(p.division_name.is_empty());
        assert_eq!(p.division_code, None);
    }

    #[test]
    fn division_without_code() {
        let p = parse_location("- Tarascon-sur-Ariège - Ariège");
        assert_eq!(p.city, "Tarascon-sur-Ariège");
        assert_eq!(p.division_name, "Ariège");
        assert_eq!(p.division_code, None);
    }

    #[test]
    fn division_is_the_segment_after_the_city() {
        let p = parse_location("- Saint-Martin - Haute - Savoie (74)");
        assert_eq!(p.city, "Saint-Martin");
        assert_eq!(p.division_name, "Haute");
        assert_eq!(p.division_code.as_deref(), Some("74"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_location(""), ParsedLocation::default());
        assert_eq!(parse_location(" - "), ParsedLocation::default());
    }

    #[test]
    fn division_codes() {
        assert_eq!(normalize_division_code("6"), "06");
        assert_eq!(normalize_division_code("6.0"), "06");
        assert_eq!(normalize_division_code(" 13 "), "13");
        assert_eq!(normalize_division_code("2a"), "2A");
        assert_eq!(normalize_division_code("974"), "974");
        assert_eq!(normalize_division_code(""), "");
    }
}
