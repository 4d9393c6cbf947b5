use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;

use crate::errors::{AppError, Result};
use crate::models::{Location, AUTO_TIMEZONE};

const DEFAULT_LOCATIONS_FILE: &str = "data/locations.json";
const DEFAULT_OUTPUT_DIR: &str = "public";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_PRODUCT_NAME: &str = "Weather Calendar";
const DEFAULT_UID_DOMAIN: &str = "weather-calendar.local";

/// Default per-request timeout. There is no retry loop, so a hung request
/// would otherwise stall the whole batch.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON file with the list of locations.
    pub locations_file: PathBuf,
    /// Root of the published files (`calendars/*.ics`, `status.json`).
    pub output_dir: PathBuf,
    /// Public URL under which `output_dir` is served.
    pub public_base_url: String,
    pub open_meteo_url: String,
    pub http_timeout: Duration,
    pub user_agent: String,
    /// Product name shown in the event footer and PRODID.
    pub product_name: String,
    /// Domain part of every event UID.
    pub uid_domain: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let default_timeout = DEFAULT_HTTP_TIMEOUT_SECS.to_string();
        let timeout_secs = parse_timeout(&get("HTTP_TIMEOUT_SECS", &default_timeout))?;

        let log_format = match get("LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(AppError::Config(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        let public_base_url = get("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL);
        if !(public_base_url.starts_with("http://") || public_base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "PUBLIC_BASE_URL must be an absolute http(s) URL, got '{}'",
                public_base_url
            )));
        }

        let product_name = get("FEED_PRODUCT_NAME", DEFAULT_PRODUCT_NAME);
        if needs_escaping(&product_name) {
            return Err(AppError::Config(format!(
                "FEED_PRODUCT_NAME must not contain ',', ';', '\\' or control characters, got {:?}",
                product_name
            )));
        }

        Ok(Self {
            locations_file: PathBuf::from(get("LOCATIONS_FILE", DEFAULT_LOCATIONS_FILE)),
            output_dir: PathBuf::from(get("OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            open_meteo_url: get("OPEN_METEO_URL", DEFAULT_OPEN_METEO_URL),
            http_timeout: Duration::from_secs(timeout_secs),
            user_agent: get(
                "WEATHER_USER_AGENT",
                concat!("weather-calendar/", env!("CARGO_PKG_VERSION")),
            ),
            product_name,
            uid_domain: get("UID_DOMAIN", DEFAULT_UID_DOMAIN),
            log_format,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if (1..=MAX_HTTP_TIMEOUT_SECS).contains(&secs) => Ok(secs),
        _ => Err(AppError::Config(format!(
            "HTTP_TIMEOUT_SECS must be a whole number from 1 to {}, got '{}'",
            MAX_HTTP_TIMEOUT_SECS, raw
        ))),
    }
}

/// Values written verbatim into the feed must not need iCalendar text escaping.
fn needs_escaping(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_control() || matches!(c, ',' | ';' | '\\'))
}

fn locations_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::Config(format!("locations file {}: {}", path.display(), e))
}

/// Read and validate the locations file.
pub async fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| locations_error(path, e))?;
    let parsed = serde_json::from_str(&raw);
    let locations: Vec<Location> = parsed.map_err(|e| locations_error(path, e))?;
    validate_locations(&locations)?;
    Ok(locations)
}

/// Check the invariants every later stage relies on: unique URL-safe slugs,
/// coordinates in range and a resolvable timezone.
pub fn validate_locations(locations: &[Location]) -> Result<()> {
    if locations.is_empty() {
        let message = "locations file lists no locations".to_string();
        return Err(AppError::Config(message));
    }

    let mut seen = HashSet::new();
    for loc in locations {
        let invalid = |message: String| AppError::InvalidLocation {
            slug: loc.slug.clone(),
            message,
        };

        if loc.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if !is_valid_slug(&loc.slug) {
            return Err(invalid(
                "slug must be lowercase letters, digits and inner dashes".to_string(),
            ));
        }
        if !seen.insert(loc.slug.as_str()) {
            return Err(invalid("slug is used more than once".to_string()));
        }
        if !valid_coordinates(loc.latitude, loc.longitude) {
            return Err(invalid(format!(
                "coordinates ({}, {}) are out of range",
                loc.latitude, loc.longitude
            )));
        }
        if let Some(tz) = &loc.timezone {
            if tz != AUTO_TIMEZONE && tz.parse::<Tz>().is_err() {
                return Err(invalid(format!("unknown timezone '{}'", tz)));
            }
        }
    }

    Ok(())
}

pub(crate) fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
