//! Product sales store with period aggregation and trend forecasting

pub mod config;
pub mod parsers;
pub mod services;
pub mod tui;
pub mod types;
