//! Run orchestration.
//!
//! Locations are processed one at a time, in configuration order:
//! fetch → build → write. The first failure aborts the whole run before
//! `status.json` is touched, so consumers keep seeing the last successful
//! timestamp. There is no retry and no partial-success mode.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::Instrument;

use crate::errors::Result;
use crate::models::Location;
use crate::services::calendar::{build_calendar, CalendarSettings};
use crate::services::open_meteo::ForecastSource;
use crate::services::output::{calendars_dir, ensure_dir, status_path, write_atomic};
use crate::services::status::{write_status, RunStatus, StatusAccumulator};

/// Everything a run needs besides the forecast source.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub output_dir: PathBuf,
    pub calendar: CalendarSettings,
}

/// Generate and publish one location's feed, recording it in `acc`.
pub async fn generate_location<S>(
    location: &Location,
    source: &S,
    settings: &GeneratorSettings,
    generated_at: DateTime<Utc>,
    acc: &mut StatusAccumulator,
) -> Result<()>
where
    S: ForecastSource + ?Sized,
{
    tracing::info!("Generating calendar for {}", location.name);

    let report = source
        .fetch_forecast(
            location.latitude,
            location.longitude,
            location.request_timezone(),
        )
        .await?;
    tracing::debug!(
        fetched_at = %report.fetched_at,
        days = report.forecast.len(),
        "Forecast received"
    );

    let ics = build_calendar(location, &report, &settings.calendar, generated_at)?;

    let path = calendars_dir(&settings.output_dir).join(location.calendar_file_name());
    write_atomic(&path, ics.as_bytes()).await?;

    tracing::info!(
        "{}: generated {} days of weather events → {}",
        location.name,
        report.forecast.len(),
        path.display()
    );

    acc.record(location, settings.calendar.calendar_url(location));
    Ok(())
}

/// Generate every feed, then write the run status.
pub async fn generate_all<S>(
    locations: &[Location],
    source: &S,
    settings: &GeneratorSettings,
    generated_at: DateTime<Utc>,
) -> Result<RunStatus>
where
    S: ForecastSource + ?Sized,
{
    tracing::info!("Processing {} location(s)", locations.len());

    ensure_dir(&settings.output_dir).await?;
    ensure_dir(&calendars_dir(&settings.output_dir)).await?;

    let mut acc = StatusAccumulator::new();
    for location in locations {
        let span = tracing::info_span!("location", slug = %location.slug);
        if let Err(e) = generate_location(location, source, settings, generated_at, &mut acc)
            .instrument(span)
            .await
        {
            tracing::error!("Failed to generate calendar for {}: {}", location.name, e);
            return Err(e);
        }
    }

    let status = acc.finish(generated_at);
    let path = status_path(&settings.output_dir);
    write_status(&path, &status).await?;
    tracing::info!(
        "Status file written ({} locations)",
        status.locations_generated
    );

    Ok(status)
}
