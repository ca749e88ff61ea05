//! Core domain types

mod error;

pub use error::{Result, SalescastError, ValidationIssue};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded sale, as read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub timestamp: DateTime<Utc>,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

impl SaleRecord {
    /// Quantity times unit price
    pub fn revenue(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    /// Check value ranges. Types are trusted, ranges are not.
    pub fn validate(&self) -> std::result::Result<(), ValidationIssue> {
        if self.quantity < 0 {
            return Err(ValidationIssue::NegativeQuantity(self.quantity));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(ValidationIssue::InvalidPrice(self.unit_price));
        }
        Ok(())
    }
}

/// Width of the aggregation bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
}

impl Granularity {
    /// First day of the period containing `date`.
    /// Weeks start on Monday, months on the 1st.
    pub fn period_start(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Day => Some(date),
            Self::Week => {
                let offset = date.weekday().num_days_from_monday();
                date.checked_sub_days(Days::new(u64::from(offset)))
            }
            Self::Month => date.with_day(1),
        }
    }

    /// Absolute ordinal of the period starting at `start`.
    /// Consecutive periods have consecutive ordinals.
    pub fn ordinal(self, start: NaiveDate) -> i64 {
        match self {
            Self::Day => i64::from(start.num_days_from_ce()),
            Self::Week => i64::from(start.num_days_from_ce()).div_euclid(7),
            Self::Month => i64::from(start.year()) * 12 + i64::from(start.month0()),
        }
    }

    /// Start of the period `periods` steps after `start`
    pub fn advance(self, start: NaiveDate, periods: u32) -> Option<NaiveDate> {
        match self {
            Self::Day => start.checked_add_days(Days::new(u64::from(periods))),
            Self::Week => start.checked_add_days(Days::new(7 * u64::from(periods))),
            Self::Month => start.checked_add_months(Months::new(periods)),
        }
    }

    /// Human-readable period label (e.g., "2024-03-18", "2024-W12", "2024-03")
    pub fn label(self, start: NaiveDate) -> String {
        match self {
            Self::Day => start.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let iso = start.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            Self::Month => start.format("%Y-%m").to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = SalescastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            other => Err(SalescastError::invalid_parameter(
                "granularity",
                format!("unknown granularity '{}' (expected day, week or month)", other),
            )),
        }
    }
}

/// Value summed per period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Quantity,
    #[default]
    Revenue,
}

impl Metric {
    pub fn value(self, record: &SaleRecord) -> f64 {
        match self {
            Self::Quantity => record.quantity as f64,
            Self::Revenue => record.revenue(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quantity => "quantity",
            Self::Revenue => "revenue",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = SalescastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantity" | "units" => Ok(Self::Quantity),
            "revenue" => Ok(Self::Revenue),
            other => Err(SalescastError::invalid_parameter(
                "metric",
                format!("unknown metric '{}' (expected quantity or revenue)", other),
            )),
        }
    }
}

/// Aggregated value for one period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period_start: NaiveDate,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(period_start: NaiveDate, value: f64) -> Self {
        Self {
            period_start,
            value,
        }
    }
}

/// Prediction for one future period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub period: NaiveDate,
    /// Periods after the last observed one (1-based)
    pub step: u32,
    pub predicted_value: f64,
    /// Half-width of the prediction interval
    pub error_margin: f64,
}

impl ForecastResult {
    pub fn lower(&self) -> f64 {
        self.predicted_value - self.error_margin
    }

    pub fn upper(&self) -> f64 {
        self.predicted_value + self.error_margin
    }
}

/// Product family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: i64,
    pub name: String,
}

/// Catalogue product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub family_id: i64,
}

/// One product line of an import file with its monthly sales
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub family: String,
    pub name: String,
    pub product_id: i64,
    pub price: f64,
    /// (first day of month, quantity)
    pub monthly_sales: Vec<(NaiveDate, i64)>,
}
