use std::path::PathBuf;

/// Result type used throughout the generator.
pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Every failure is fatal to the run; none of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid location '{slug}': {message}")]
    InvalidLocation { slug: String, message: String },

    #[error(
        "Invalid coordinates ({latitude}, {longitude}): latitude must be -90 to 90, \
         longitude must be -180 to 180"
    )]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Transport failure, timeout, or non-2xx response from the forecast provider.
    #[error("Forecast request failed: {message}")]
    Fetch {
        status: Option<u16>,
        message: String,
    },

    /// The provider answered, but not with the structure we expect.
    #[error("Unexpected forecast data: {0}")]
    DataShape(String),

    /// The forecast is not sufficient to produce a well-formed calendar.
    #[error("Cannot build calendar: {0}")]
    Build(String),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Write {
            path: path.into(),
            source,
        }
    }
}
