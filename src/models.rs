use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Timezone value that asks the provider to resolve the location's local zone.
pub const AUTO_TIMEZONE: &str = "auto";

/// A configured location, loaded once from the locations file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub name: String,
    /// URL-safe identifier, used for the output file name and public URL.
    pub slug: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
    /// IANA zone name. When absent the provider resolves it (`auto`).
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub continent: Option<String>,
}

impl Location {
    /// Timezone parameter for the forecast request.
    pub fn request_timezone(&self) -> &str {
        self.timezone.as_deref().unwrap_or(AUTO_TIMEZONE)
    }

    pub fn calendar_file_name(&self) -> String {
        format!("{}.ics", self.slug)
    }
}

/// One forecast day, transposed from the provider's parallel arrays.
///
/// Optional provider fields are already defaulted to 0. The required ones
/// stay `None` when the provider sent null; the calendar builder rejects them.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// WMO weather interpretation code
    pub weather_code: Option<i32>,
    /// Maximum temperature in °C, rounded to a whole degree
    pub temp_max: Option<i64>,
    /// Minimum temperature in °C, rounded to a whole degree
    pub temp_min: Option<i64>,
    /// Precipitation sum in mm
    pub precipitation: f64,
    /// Maximum precipitation probability in %
    pub precipitation_probability: f64,
    /// Maximum wind speed at 10 m in km/h
    pub wind_speed: f64,
    pub uv_index: f64,
}

/// Normalized result of one forecast fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    /// Ordered by date, unique dates.
    pub forecast: Vec<DailyForecast>,
    pub fetched_at: DateTime<Utc>,
    // Echoed by the provider; the timezone is the resolved one when `auto` was sent.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}
