//! Services for aggregation, forecasting and storage

pub mod aggregator;
pub mod evaluation;
pub mod forecaster;
pub mod pipeline;
pub mod store;

pub use aggregator::Aggregator;
pub use evaluation::EvaluationReport;
pub use forecaster::{Forecaster, LinearTrend, MeanTrend, TrendModel};
pub use pipeline::{ModelKind, Pipeline, PipelineOutput, ProductForecast};
pub use store::{ImportSummary, SalesStore};
