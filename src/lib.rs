//! City weather resolution library
//!
//! Resolves a city name to a normalized weather snapshot: a time-bucketed
//! cache first, then a live Open-Meteo geocode + forecast lookup, then a
//! deterministic mock derived from the city name.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod service;

pub use data::{CacheStatus, Condition, SnapshotSource, WeatherSnapshot};
pub use service::WeatherService;
