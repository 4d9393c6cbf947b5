// Weather Calendar generator v0.1
use std::process::ExitCode;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_calendar::config::{load_locations, AppConfig, LogFormat};
use weather_calendar::services::calendar::CalendarSettings;
use weather_calendar::services::generator::{generate_all, GeneratorSettings};
use weather_calendar::services::open_meteo::OpenMeteoClient;
use weather_calendar::services::status::RunStatus;
use weather_calendar::Result;

/// Conventional exit status for a process stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weather_calendar=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn run(config: &AppConfig) -> Result<RunStatus> {
    let locations = load_locations(&config.locations_file).await?;

    let client = OpenMeteoClient::new(
        &config.open_meteo_url,
        &config.user_agent,
        config.http_timeout,
    )?;

    let settings = GeneratorSettings {
        output_dir: config.output_dir.clone(),
        calendar: CalendarSettings {
            public_base_url: config.public_base_url.clone(),
            product_name: config.product_name.clone(),
            uid_domain: config.uid_domain.clone(),
        },
    };

    generate_all(&locations, &client, &settings, Utc::now()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Text);
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    tracing::info!("Starting calendar generation");

    // An interrupt drops the in-flight run; status.json is only written at
    // the very end, so the previous one stays authoritative.
    tokio::select! {
        result = run(&config) => match result {
            Ok(status) => {
                tracing::info!(
                    "All calendars generated successfully ({} locations, next update {})",
                    status.locations_generated,
                    status.next_update
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!("Calendar generation failed: {}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Calendar generation interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}
