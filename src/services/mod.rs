pub mod calendar;
pub mod conditions;
pub mod generator;
pub mod open_meteo;
pub mod output;
pub mod status;
