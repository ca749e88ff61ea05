//! Error types shared across the crate

use chrono::NaiveDate;
use thiserror::Error;

/// Why a sale record was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("negative quantity {0}")]
    NegativeQuantity(i64),

    #[error("invalid unit price {0}")]
    InvalidPrice(f64),

    #[error("malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    /// quantity × price does not fit in an f64
    #[error("value {0} is not finite")]
    NonFiniteValue(f64),

    #[error("total for period starting {0} is not finite")]
    PeriodOverflow(NaiveDate),
}

#[derive(Error, Debug)]
pub enum SalescastError {
    /// A sale record failed range validation
    #[error("Invalid sale record #{index} (product {product_id}): {issue}")]
    Validation {
        index: usize,
        product_id: i64,
        issue: ValidationIssue,
    },

    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl SalescastError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SalescastError>;
