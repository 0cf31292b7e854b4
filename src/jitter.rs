use sha2::{Digest, Sha256};

use crate::listing::{Coordinates, ListingRecord};

/// Suffix that gives longitude its own hash stream.
const LONGITUDE_SUFFIX: &str = "_x";

/// Uniform value in [0, 1) from the first four bytes of SHA-256(key).
pub fn unit_interval(key: &str) -> f64 {
    let digest = Sha256::digest(key.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    head as f64 / (u32::MAX as f64 + 1.0)
}

/// `value` shifted by a key-determined amount in [-magnitude, +magnitude).
pub fn jitter(value: f64, key: &str, magnitude: f64) -> f64 {
    value + (unit_interval(key) - 0.5) * 2.0 * magnitude
}

pub fn project(coords: Coordinates, key: &str, magnitude: f64) -> Coordinates {
    Coordinates {
        lat: jitter(coords.lat, key, magnitude),
        lon: jitter(coords.lon, &format!("{key}{LONGITUDE_SUFFIX}"), magnitude),
    }
}

/// Fill display coordinates for every geocoded record; returns how many were set.
pub fn project_all(records: &mut [ListingRecord], magnitude: f64) -> usize {
    let mut n = 0;
    for rec in records.iter_mut() {
        rec.display = rec
            .coordinates
            .map(|c| project(c, &rec.identity_key(), magnitude));
        if rec.display.is_some() {
            n += 1;
        }
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_identical_on_repeat() {
        let a = jitter(48.85, "abc", 0.004);
        let b = jitter(48.85, "abc", 0.004);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn stable_reference_value() {
        // SHA-256("abc") starts with ba7816bf.
        let expected = 0xba78_16bf_u32 as f64 / 4_294_967_296.0;
        assert_eq!(unit_interval("abc"), expected);
    }

    #[test]
    fn longitude_key_differs_from_latitude_key() {
        let lat_offset = jitter(0.0, "abc", 0.004);
        let lon_offset = jitter(0.0, "abc_x", 0.004);
        assert_ne!(lat_offset, lon_offset);

        let p = project(Coordinates { lat: 0.0, lon: 0.0 }, "abc", 0.004);
        assert_eq!(p.lat, lat_offset);
        assert_eq!(p.lon, lon_offset);
    }

    #[test]
    fn offset_within_magnitude() {
        for i in 0..500 {
            let key = format!("https://example.org/annonce/{i}");
            let v = jitter(45.0, &key, 0.004);
            assert!((v - 45.0).abs() <= 0.004, "offset out of range for {key}");
        }
    }

    #[test]
    fn project_all_skips_missing_coordinates() {
        let mut records = vec![
            ListingRecord {
                row_index: 0,
                url: Some("https://example.org/a".into()),
                coordinates: Some(Coordinates { lat: 45.76, lon: 4.83 }),
                ..Default::default()
            },
            ListingRecord {
                row_index: 1,
                ..Default::default()
            },
        ];
        assert_eq!(project_all(&mut records, 0.004), 1);
        let expected = project(Coordinates { lat: 45.76, lon: 4.83 }, "https://example.org/a", 0.004);
        assert_eq!(records[0].display, Some(expected));
        assert!(records[1].display.is_none());
    }
}
