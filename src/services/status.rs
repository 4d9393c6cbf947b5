//! Run status document.
//!
//! The presentation layer reads `status.json` to show when the feeds were
//! last refreshed. It is only written after every location succeeded, so a
//! failed run leaves the previous (still accurate) document in place.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::path::Path;

use crate::errors::Result;
use crate::models::Location;
use crate::services::output::write_atomic;

/// Expected delay until the next scheduled run.
const NEXT_UPDATE_HOURS: i64 = 24;

/// One published feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStatus {
    pub name: String,
    pub slug: String,
    pub calendar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub last_generated: DateTime<Utc>,
    /// Always true: partial runs never produce a status document.
    pub success: bool,
    pub locations_generated: usize,
    pub locations: Vec<LocationStatus>,
    pub next_update: DateTime<Utc>,
}

/// Per-location results collected while a run is in progress.
#[derive(Debug, Default)]
pub struct StatusAccumulator {
    locations: Vec<LocationStatus>,
}

impl StatusAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, location: &Location, calendar_url: String) {
        self.locations.push(LocationStatus {
            name: location.name.clone(),
            slug: location.slug.clone(),
            calendar_url,
            continent: location.continent.clone(),
        });
    }

    /// Close the run. Only called once every location has been published.
    pub fn finish(self, generated_at: DateTime<Utc>) -> RunStatus {
        RunStatus {
            last_generated: generated_at,
            success: true,
            locations_generated: self.locations.len(),
            locations: self.locations,
            next_update: generated_at + Duration::hours(NEXT_UPDATE_HOURS),
        }
    }
}

impl RunStatus {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub async fn write_status(path: &Path, status: &RunStatus) -> Result<()> {
    let json = status.to_json_pretty()?;
    write_atomic(path, json.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str, slug: &str, continent: Option<&str>) -> Location {
        Location {
            name: name.to_string(),
            slug: slug.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: None,
            continent: continent.map(str::to_string),
        }
    }

    fn paris_url() -> String {
        "https://x/calendars/paris.ics".to_string()
    }

    fn tokyo_url() -> String {
        "https://x/calendars/tokyo.ics".to_string()
    }

    fn generated_at() -> DateTime<Utc> {
        "2024-01-01T06:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_finish_counts_and_schedules_next_update() {
        let mut acc = StatusAccumulator::new();
        acc.record(&location("Paris", "paris", None), paris_url());
        acc.record(&location("Tokyo", "tokyo", None), tokyo_url());

        let status = acc.finish(generated_at());
        assert!(status.success);
        assert_eq!(status.locations_generated, 2);
        assert_eq!(status.locations[1].slug, "tokyo");
        assert_eq!(
            status.next_update,
            "2024-01-02T06:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_status_json_field_names() {
        let mut acc = StatusAccumulator::new();
        acc.record(
            &location("Toronto", "toronto", Some("North America")),
            "https://x/calendars/toronto.ics".into(),
        );
        acc.record(&location("Paris", "paris", None), paris_url());

        let raw = acc.finish(generated_at()).to_json_pretty().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["lastGenerated"], "2024-01-01T06:00:00Z");
        assert_eq!(json["nextUpdate"], "2024-01-02T06:00:00Z");
        assert_eq!(json["success"], true);
        assert_eq!(json["locationsGenerated"], 2);
        assert_eq!(
            json["locations"][0]["calendarUrl"],
            "https://x/calendars/toronto.ics"
        );
        assert_eq!(json["locations"][0]["continent"], "North America");
        assert!(json["locations"][1].get("continent").is_none());
    }

    #[test]
    fn test_write_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let status = StatusAccumulator::new().finish(generated_at());

        tokio_test::block_on(write_status(&path, &status)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let written: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(written["locationsGenerated"], 0);
    }
}
