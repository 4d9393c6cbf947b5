//! Weather Calendar: daily forecasts from Open-Meteo published as
//! subscribable iCalendar feeds, plus a `status.json` describing the last run.

pub mod config;
pub mod errors;
mod helpers;
pub mod models;
pub mod services;

pub use errors::{AppError, Result};
