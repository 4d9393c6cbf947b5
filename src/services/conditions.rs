//! WMO weather interpretation codes → display glyph and description.
//!
//! Both lookups walk the same ordered range table, so they agree on which
//! codes are known. Anything outside every range gets the fallback values.
//! See: https://open-meteo.com/en/docs (WMO Weather interpretation codes)

/// Glyph for codes outside every known range.
pub const FALLBACK_GLYPH: &str = "🌤️";

/// Description for codes outside every known range.
pub const FALLBACK_DESCRIPTION: &str = "Unknown weather condition";

/// One condition category covering the inclusive code range `first..=last`.
struct ConditionRange {
    first: i32,
    last: i32,
    glyph: &'static str,
    /// Used for codes inside the range that have no specific phrase.
    category: &'static str,
}

const fn condition(
    first: i32,
    last: i32,
    glyph: &'static str,
    category: &'static str,
) -> ConditionRange {
    ConditionRange {
        first,
        last,
        glyph,
        category,
    }
}

static CONDITION_RANGES: [ConditionRange; 9] = [
    condition(0, 0, "☀️", "Clear sky"),
    condition(1, 3, "⛅", "Partly cloudy"),
    condition(45, 48, "🌫️", "Fog"),
    condition(51, 57, "🌦️", "Drizzle"),
    condition(61, 67, "🌧️", "Rain"),
    condition(71, 77, "🌨️", "Snow"),
    condition(80, 82, "🌧️", "Rain showers"),
    condition(85, 86, "🌨️", "Snow showers"),
    condition(95, 99, "⛈️", "Thunderstorm"),
];

/// Phrases for the codes Open-Meteo actually emits.
static CODE_DESCRIPTIONS: [(i32, &str); 28] = [
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Fog"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (56, "Light freezing drizzle"),
    (57, "Dense freezing drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (66, "Light freezing rain"),
    (67, "Heavy freezing rain"),
    (71, "Slight snow"),
    (73, "Moderate snow"),
    (75, "Heavy snow"),
    (77, "Snow grains"),
    (80, "Slight rain showers"),
    (81, "Moderate rain showers"),
    (82, "Violent rain showers"),
    (85, "Slight snow showers"),
    (86, "Heavy snow showers"),
    (95, "Thunderstorm"),
    (96, "Thunderstorm with slight hail"),
    (99, "Thunderstorm with heavy hail"),
];

fn find_range(code: i32) -> Option<&'static ConditionRange> {
    CONDITION_RANGES
        .iter()
        .find(|r| (r.first..=r.last).contains(&code))
}

/// Emoji for a weather code. Never fails.
pub fn weather_glyph(code: i32) -> &'static str {
    find_range(code).map_or(FALLBACK_GLYPH, |r| r.glyph)
}

/// Human-readable condition for a weather code. Never fails.
pub fn weather_description(code: i32) -> &'static str {
    let Some(range) = find_range(code) else {
        return FALLBACK_DESCRIPTION;
    };
    CODE_DESCRIPTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(range.category, |&(_, text)| text)
}
