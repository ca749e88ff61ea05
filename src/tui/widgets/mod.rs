//! TUI widgets

pub mod chart;
pub mod forecast;
pub mod overview;
pub mod spinner;
pub mod tabs;
