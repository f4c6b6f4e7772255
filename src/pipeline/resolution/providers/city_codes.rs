use std::sync::LazyLock;

use regex::Regex;

/// Well-known cities and their IATA metropolitan codes.
const KNOWN_CITIES: &[(&str, &str)] = &[
    ("new york", "NYC"),
    ("los angeles", "LAX"),
    ("san francisco", "SFO"),
    ("hong kong", "HKG"),
    ("paris", "PAR"),
    ("london", "LON"),
    ("tokyo", "TYO"),
    ("chicago", "CHI"),
    ("miami", "MIA"),
    ("dubai", "DXB"),
    ("singapore", "SIN"),
    ("barcelona", "BCN"),
    ("rome", "ROM"),
    ("amsterdam", "AMS"),
    ("berlin", "BER"),
    ("madrid", "MAD"),
    ("sydney", "SYD"),
    ("melbourne", "MEL"),
    ("bangkok", "BKK"),
    ("istanbul", "IST"),
    ("lisbon", "LIS"),
    ("kyoto", "UKY"),
];

/// Standalone three-letter uppercase token.
static IATA_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z]{3})\b").unwrap());

/// Best-effort IATA city code for a free-text location.
///
/// A known city name anywhere in the text wins; otherwise a standalone
/// three-letter uppercase token is taken as a code.
pub fn city_code(location: &str) -> Option<String> {
    let lower = location.to_lowercase();
    if let Some((_, code)) = KNOWN_CITIES.iter().find(|(city, _)| lower.contains(city)) {
        return Some((*code).to_string());
    }
    IATA_CODE
        .captures(location)
        .map(|caps| caps[1].to_string())
}
