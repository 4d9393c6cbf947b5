//! iCalendar feed generation.
//!
//! One all-day event per forecast day. Events are informational only: they
//! are transparent (free), confirmed, and never carry alarms. UIDs depend only
//! on the location slug and the date, so a regenerated feed updates existing
//! events in subscribed clients instead of duplicating them.

use chrono::{DateTime, Days, NaiveDate, Utc};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::errors::{AppError, Result};
use crate::helpers::{format_amount, round_half_up};
use crate::models::{DailyForecast, ForecastReport, Location};
use crate::services::conditions::{weather_description, weather_glyph};

/// How often subscribed clients should re-poll the feed.
/// Forecasts change a few times a day; polling more often only loads the host.
pub const REFRESH_INTERVAL: &str = "PT4H";

const DATA_SOURCE_FOOTER: &str = "Data from Open-Meteo.com";

/// Feed-wide settings shared by every location.
#[derive(Debug, Clone)]
pub struct CalendarSettings {
    /// Public URL under which the output directory is served, without trailing slash.
    pub public_base_url: String,
    pub product_name: String,
    pub uid_domain: String,
}

impl CalendarSettings {
    /// Canonical URL of a location's feed.
    pub fn calendar_url(&self, location: &Location) -> String {
        format!(
            "{}/calendars/{}",
            self.public_base_url,
            location.calendar_file_name()
        )
    }

    /// Stable identifier for a location's event on `date`.
    pub fn event_uid(&self, slug: &str, date: NaiveDate) -> String {
        format!(
            "weather-{}-{}@{}",
            slug,
            date.format("%Y-%m-%d"),
            self.uid_domain
        )
    }
}

/// The fields of a day that an event cannot be rendered without.
struct RequiredFields {
    weather_code: i32,
    high: i64,
    low: i64,
}

fn required_fields(day: &DailyForecast) -> Result<RequiredFields> {
    let missing = |field: &str| AppError::Build(format!("day {} has no {}", day.date, field));
    Ok(RequiredFields {
        weather_code: day.weather_code.ok_or_else(|| missing("weather code"))?,
        high: day.temp_max.ok_or_else(|| missing("maximum temperature"))?,
        low: day.temp_min.ok_or_else(|| missing("minimum temperature"))?,
    })
}

/// Short event title, e.g. `☀️ 5°/-2°`.
pub fn event_title(day: &DailyForecast) -> Result<String> {
    let f = required_fields(day)?;
    let glyph = weather_glyph(f.weather_code);
    Ok(format!("{} {}°/{}°", glyph, f.high, f.low))
}

/// Multi-line event body. Precipitation, wind and UV lines only appear when
/// the value is above zero.
pub fn event_description(day: &DailyForecast, product_name: &str) -> Result<String> {
    let f = required_fields(day)?;

    let mut lines = vec![
        format!("Weather: {}", weather_description(f.weather_code)),
        format!("High: {}°C, Low: {}°C", f.high, f.low),
    ];

    if day.precipitation > 0.0 {
        lines.push(format!(
            "Precipitation: {}mm ({}% chance)",
            format_amount(day.precipitation),
            format_amount(day.precipitation_probability)
        ));
    }
    if day.wind_speed > 0.0 {
        lines.push(format!("Wind: {} km/h", round_half_up(day.wind_speed)));
    }
    if day.uv_index > 0.0 {
        lines.push(format!("UV Index: {}", round_half_up(day.uv_index)));
    }

    lines.push(String::new());
    lines.push("---".to_string());
    let powered_by = format!("Powered by {} - Weather in your calendar", product_name);
    lines.push(powered_by);
    lines.push(DATA_SOURCE_FOOTER.to_string());

    Ok(lines.join("\n"))
}

fn build_event(
    location: &Location,
    day: &DailyForecast,
    settings: &CalendarSettings,
    generated_at: DateTime<Utc>,
) -> Result<icalendar::Event> {
    let end = day
        .date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::Build(format!("date {} is out of range", day.date)))?;

    let mut event = icalendar::Event::new();
    event.uid(&settings.event_uid(&location.slug, day.date));
    event.summary(&event_title(day)?);
    event.description(&event_description(day, &settings.product_name)?);
    event.location(&location.name);
    let stamp = generated_at.format("%Y%m%dT%H%M%SZ").to_string();
    event.add_property("DTSTAMP", stamp);

    add_date_property(&mut event, "DTSTART", day.date);
    add_date_property(&mut event, "DTEND", end);

    event.add_property("STATUS", "CONFIRMED");
    event.add_property("TRANSP", "TRANSPARENT");
    event.add_property("X-MICROSOFT-CDO-BUSYSTATUS", "FREE");

    Ok(event.done())
}

/// Add a `VALUE=DATE` property (all-day boundary).
fn add_date_property(event: &mut icalendar::Event, name: &str, date: NaiveDate) {
    let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    event.append_property(prop);
}

/// Render the complete feed for one location.
///
/// The feed timezone is the configured one, else the zone the provider
/// resolved for `auto`, else UTC.
pub fn build_calendar(
    location: &Location,
    report: &ForecastReport,
    settings: &CalendarSettings,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    if report.forecast.is_empty() {
        return Err(AppError::Build(format!(
            "forecast for '{}' contains no days",
            location.slug
        )));
    }

    let timezone = location
        .timezone
        .as_deref()
        .filter(|tz| *tz != crate::models::AUTO_TIMEZONE)
        .or(report.timezone.as_deref())
        .unwrap_or("UTC");

    let mut cal = Calendar::new();
    cal.append_property(Property::new("METHOD", "PUBLISH"));
    let name = format!("{} Weather", location.name);
    cal.append_property(Property::new("X-WR-CALNAME", name));
    let description = format!(
        "{} weather forecasts - automatically updated daily",
        location.name
    );
    cal.append_property(Property::new("X-WR-CALDESC", description));
    cal.append_property(Property::new("X-WR-TIMEZONE", timezone));
    let mut refresh = Property::new("REFRESH-INTERVAL", REFRESH_INTERVAL);
    refresh.add_parameter("VALUE", "DURATION");
    cal.append_property(refresh);
    cal.append_property(Property::new("X-PUBLISHED-TTL", REFRESH_INTERVAL));
    cal.append_property(Property::new("URL", settings.calendar_url(location)));

    for day in &report.forecast {
        cal.push(build_event(location, day, settings, generated_at)?);
    }

    let ics = cal.done().to_string();
    Ok(finalize_ics(&ics, &settings.product_name))
}

/// Replace the icalendar crate's generic PRODID with ours and normalize
/// line endings to CRLF.
///
/// PRODID is written verbatim; the configuration rejects product names that
/// would need text escaping.
fn finalize_ics(ics: &str, product_name: &str) -> String {
    let prodid = format!("PRODID:-//{}//Daily Forecast//EN", product_name);
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str(&prodid);
        } else {
            result.push_str(line);
        }
        result.push_str("\r\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CalendarSettings {
        CalendarSettings {
            public_base_url: "https://example.org/weather".to_string(),
            product_name: "Weather Calendar".to_string(),
            uid_domain: "weather-calendar.local".to_string(),
        }
    }

    fn paris() -> Location {
        Location {
            name: "Paris".to_string(),
            slug: "paris".to_string(),
            latitude: 48.85,
            longitude: 2.35,
            timezone: None,
            continent: Some("Europe".to_string()),
        }
    }

    fn day(date: &str, code: i32, high: i64, low: i64) -> DailyForecast {
        DailyForecast {
            date: date.parse().unwrap(),
            weather_code: Some(code),
            temp_max: Some(high),
            temp_min: Some(low),
            precipitation: 0.0,
            precipitation_probability: 0.0,
            wind_speed: 0.0,
            uv_index: 0.0,
        }
    }

    fn report(forecast: Vec<DailyForecast>) -> ForecastReport {
        ForecastReport {
            forecast,
            fetched_at: Utc::now(),
            latitude: Some(48.86),
            longitude: Some(2.34),
            timezone: Some("Europe/Paris".to_string()),
        }
    }

    fn generated_at() -> DateTime<Utc> {
        "2024-01-01T06:00:00Z".parse().unwrap()
    }

    /// Undo RFC 5545 line folding so assertions can match whole properties.
    fn unfold(ics: &str) -> String {
        ics.replace("\r\n ", "").replace("\r\n\t", "")
    }

    /// Build a feed and return it unfolded.
    fn render(location: &Location, forecast: Vec<DailyForecast>) -> String {
        let ics = build_calendar(location, &report(forecast), &settings(), generated_at());
        unfold(&ics.unwrap())
    }

    fn title(code: i32, high: i64, low: i64) -> String {
        event_title(&day("2024-01-01", code, high, low)).unwrap()
    }

    #[test]
    fn test_event_title() {
        assert_eq!(title(0, 5, -2), "☀️ 5°/-2°");
        assert_eq!(title(63, 12, 7), "🌧️ 12°/7°");
        assert_eq!(title(42, 1, 0), "🌤️ 1°/0°");
    }

    #[test]
    fn test_description_dry_calm_day() {
        let text = event_description(&day("2024-01-01", 0, 5, -2), "Weather Calendar").unwrap();
        assert_eq!(
            text,
            "Weather: Clear sky\n\
             High: 5°C, Low: -2°C\n\
             \n\
             ---\n\
             Powered by Weather Calendar - Weather in your calendar\n\
             Data from Open-Meteo.com"
        );
        assert!(!text.contains("Precipitation"));
        assert!(!text.contains("Wind"));
        assert!(!text.contains("UV"));
    }

    #[test]
    fn test_description_precipitation_line() {
        let mut d = day("2024-01-02", 61, 7, 1);
        d.precipitation = 3.2;
        d.precipitation_probability = 40.0;
        let text = event_description(&d, "Weather Calendar").unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&"Precipitation: 3.2mm (40% chance)"));
    }

    #[test]
    fn test_description_wind_and_uv_are_rounded() {
        let mut d = day("2024-01-02", 2, 20, 11);
        d.wind_speed = 14.5;
        d.uv_index = 3.4;
        let text = event_description(&d, "Weather Calendar").unwrap();
        assert!(text.lines().any(|l| l == "Wind: 15 km/h"));
        assert!(text.lines().any(|l| l == "UV Index: 3"));
    }

    #[test]
    fn test_missing_required_field_is_build_error() {
        let mut d = day("2024-01-02", 2, 20, 11);
        d.temp_min = None;
        let err = event_title(&d).unwrap_err();
        assert!(matches!(err, AppError::Build(ref m) if m.contains("2024-01-02")));

        let result = build_calendar(&paris(), &report(vec![d]), &settings(), generated_at());
        assert!(matches!(result, Err(AppError::Build(_))));
    }

    #[test]
    fn test_empty_forecast_is_build_error() {
        let result = build_calendar(&paris(), &report(vec![]), &settings(), generated_at());
        assert!(matches!(result, Err(AppError::Build(_))));
    }

    #[test]
    fn test_one_event_per_day_with_unique_uids() {
        let forecast = vec![
            day("2024-01-01", 0, 5, -2),
            day("2024-01-02", 3, 6, 0),
            day("2024-01-03", 71, 1, -4),
        ];
        let ics = render(&paris(), forecast);

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 3);
        assert_eq!(ics.matches("TRANSP:TRANSPARENT").count(), 3);
        assert_eq!(ics.matches("STATUS:CONFIRMED").count(), 3);
        assert_eq!(ics.matches("X-MICROSOFT-CDO-BUSYSTATUS:FREE").count(), 3);
        assert!(!ics.contains("BEGIN:VALARM"));

        let uids: Vec<&str> = ics.lines().filter(|l| l.starts_with("UID:")).collect();
        assert_eq!(
            uids,
            vec![
                "UID:weather-paris-2024-01-01@weather-calendar.local",
                "UID:weather-paris-2024-01-02@weather-calendar.local",
                "UID:weather-paris-2024-01-03@weather-calendar.local",
            ]
        );
    }

    #[test]
    fn test_all_day_boundaries() {
        let ics = render(&paris(), vec![day("2024-12-31", 0, 5, -2)]);
        assert!(ics.contains("DTSTART;VALUE=DATE:20241231"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250101"));
        assert!(ics.contains("DTSTAMP:20240101T060000Z"));
    }

    #[test]
    fn test_document_metadata() {
        let ics = render(&paris(), vec![day("2024-01-01", 0, 5, -2)]);
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("PRODID:-//Weather Calendar//Daily Forecast//EN\r\n"));
        assert!(ics.contains("METHOD:PUBLISH"));
        assert!(ics.contains("X-WR-CALNAME:Paris Weather"));
        // Location has no timezone, so the provider-resolved one is used.
        assert!(ics.contains("X-WR-TIMEZONE:Europe/Paris"));
        assert!(ics.contains("REFRESH-INTERVAL;VALUE=DURATION:PT4H"));
        assert!(ics.contains("X-PUBLISHED-TTL:PT4H"));
        assert!(ics.contains("URL:https://example.org/weather/calendars/paris.ics"));
        assert!(ics.contains("LOCATION:Paris"));
        assert!(ics.trim_end().ends_with("END:VCALENDAR"));
    }

    #[test]
    fn test_configured_timezone_wins() {
        let mut loc = paris();
        loc.timezone = Some("America/Toronto".to_string());
        let ics = render(&loc, vec![day("2024-01-01", 0, 5, -2)]);
        assert!(ics.contains("X-WR-TIMEZONE:America/Toronto"));
    }

    #[test]
    fn test_uids_stable_across_regeneration() {
        let forecast = vec![day("2024-01-01", 0, 5, -2), day("2024-01-02", 3, 6, 0)];
        let settings = settings();
        let morning = generated_at();
        let evening: DateTime<Utc> = "2024-01-01T18:00:00Z".parse().unwrap();

        let first = build_calendar(&paris(), &report(forecast.clone()), &settings, morning);
        let second = build_calendar(&paris(), &report(forecast), &settings, evening);
        let (first, second) = (first.unwrap(), second.unwrap());

        let uids = |ics: &str| -> Vec<String> {
            unfold(ics)
                .lines()
                .filter(|l| l.starts_with("UID:"))
                .map(str::to_string)
                .collect()
        };
        assert_eq!(uids(&first), uids(&second));
        assert_ne!(first, second);
    }
}
