//! Open-Meteo forecast client.
//!
//! Fetches a fixed 16-day daily forecast for one location and transposes the
//! provider's parallel arrays (one per measured field) into one
//! `DailyForecast` per day.
//! See: https://open-meteo.com/en/docs

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::valid_coordinates;
use crate::errors::{AppError, Result};
use crate::helpers::opt_round_half_up;
use crate::models::{DailyForecast, ForecastReport};

/// Forecast horizon requested from the provider (its maximum).
pub const FORECAST_DAYS: u8 = 16;

const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
    precipitation_sum,precipitation_probability_max,wind_speed_10m_max,uv_index_max";

/// Anything that can produce a normalized forecast for a coordinate.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// `timezone` is an IANA zone name or `auto`.
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<ForecastReport>;
}

/// Client for the Open-Meteo forecast endpoint.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    forecast_url: String,
    timeout: Duration,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
    daily: Option<DailyData>,
}

/// Every field is one array indexed by day. Individual entries can be null.
#[derive(Debug, Deserialize)]
struct DailyData {
    time: Option<Vec<String>>,
    weather_code: Option<Vec<Option<i32>>>,
    temperature_2m_max: Option<Vec<Option<f64>>>,
    temperature_2m_min: Option<Vec<Option<f64>>>,
    precipitation_sum: Option<Vec<Option<f64>>>,
    precipitation_probability_max: Option<Vec<Option<f64>>>,
    wind_speed_10m_max: Option<Vec<Option<f64>>>,
    uv_index_max: Option<Vec<Option<f64>>>,
}

impl OpenMeteoClient {
    pub fn new(forecast_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| AppError::Config(format!("Invalid User-Agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            forecast_url: forecast_url.to_string(),
            timeout,
        })
    }

    fn request_error(&self, e: reqwest::Error) -> AppError {
        let message = if e.is_timeout() {
            let secs = self.timeout.as_secs();
            format!("Open-Meteo request timed out after {}s", secs)
        } else {
            format!("Open-Meteo request failed: {}", e)
        };
        AppError::Fetch {
            status: e.status().map(|s| s.as_u16()),
            message,
        }
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    #[instrument(skip(self), fields(lat = %latitude, lon = %longitude))]
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> Result<ForecastReport> {
        if !valid_coordinates(latitude, longitude) {
            return Err(AppError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        let forecast_days = FORECAST_DAYS.to_string();
        let latitude_param = latitude.to_string();
        let longitude_param = longitude.to_string();
        let query = [
            ("latitude", latitude_param.as_str()),
            ("longitude", longitude_param.as_str()),
            ("daily", DAILY_FIELDS),
            ("timezone", timezone),
            ("forecast_days", forecast_days.as_str()),
        ];

        debug!(url = %self.forecast_url, "Fetching daily forecast");

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                status: Some(status.as_u16()),
                message: format!("Open-Meteo returned HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;
        let report = parse_forecast_response(&body)?;

        debug!(days = report.forecast.len(), "Processed daily forecast");
        Ok(report)
    }
}

/// Parse an Open-Meteo response body into a `ForecastReport`.
///
/// Pure function (no I/O), so the shape rules can be tested without a server.
pub fn parse_forecast_response(body: &str) -> Result<ForecastReport> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| AppError::DataShape(format!("Open-Meteo response structure error: {}", e)))?;

    let daily = api_response
        .daily
        .ok_or_else(|| AppError::DataShape("response has no daily forecast".to_string()))?;

    Ok(ForecastReport {
        forecast: transpose_daily(daily)?,
        fetched_at: Utc::now(),
        latitude: api_response.latitude,
        longitude: api_response.longitude,
        timezone: api_response.timezone,
    })
}

/// Zip the per-field arrays into one record per day.
///
/// `time` is the primary series and is required. Every other array must
/// match its length when present; the optional measurements default to 0.
fn transpose_daily(daily: DailyData) -> Result<Vec<DailyForecast>> {
    let time = daily
        .time
        .ok_or_else(|| AppError::DataShape("daily forecast has no time series".to_string()))?;
    let days = time.len();

    let weather_code = column("weather_code", daily.weather_code, days)?;
    let temp_max = column("temperature_2m_max", daily.temperature_2m_max, days)?;
    let temp_min = column("temperature_2m_min", daily.temperature_2m_min, days)?;
    let precipitation = column("precipitation_sum", daily.precipitation_sum, days)?;
    let probability = column(
        "precipitation_probability_max",
        daily.precipitation_probability_max,
        days,
    )?;
    let wind = column("wind_speed_10m_max", daily.wind_speed_10m_max, days)?;
    let uv = column("uv_index_max", daily.uv_index_max, days)?;

    let mut seen = HashSet::with_capacity(days);
    let mut forecast = Vec::with_capacity(days);

    for (i, raw_date) in time.iter().enumerate() {
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| AppError::DataShape(format!("invalid date '{}': {}", raw_date, e)))?;
        if !seen.insert(date) {
            let message = format!("duplicate forecast date {}", date);
            return Err(AppError::DataShape(message));
        }

        forecast.push(DailyForecast {
            date,
            weather_code: weather_code[i],
            temp_max: opt_round_half_up(temp_max[i]),
            temp_min: opt_round_half_up(temp_min[i]),
            precipitation: precipitation[i].unwrap_or(0.0),
            precipitation_probability: probability[i].unwrap_or(0.0),
            wind_speed: wind[i].unwrap_or(0.0),
            uv_index: uv[i].unwrap_or(0.0),
        });
    }

    Ok(forecast)
}

/// A missing array becomes all-`None`; a present one must have `days` entries.
fn column<T: Copy>(
    name: &str,
    values: Option<Vec<Option<T>>>,
    days: usize,
) -> Result<Vec<Option<T>>> {
    match values {
        None => Ok(vec![None; days]),
        Some(v) if v.len() == days => Ok(v),
        Some(v) => Err(AppError::DataShape(format!(
            "daily.{} has {} entries, expected {}",
            name,
            v.len(),
            days
        ))),
    }
}
