//! Aggregate-then-forecast pipeline
//!
//! Bundles the explicit parameters of one forecasting run and executes it over
//! a record set, either for all records together or product by product.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregator::Aggregator;
use super::evaluation::{self, EvaluationReport};
use super::forecaster::{Forecaster, LinearTrend, MeanTrend, TrendModel, DEFAULT_CONFIDENCE};
use crate::types::{
    ForecastResult, Granularity, Metric, Result, SaleRecord, SalescastError, TimeSeriesPoint,
};

/// Which trend model to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Linear,
    Mean,
}

impl ModelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Mean => "mean",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = SalescastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "mean" => Ok(Self::Mean),
            other => Err(SalescastError::invalid_parameter(
                "model",
                format!("unknown model '{}' (expected linear or mean)", other),
            )),
        }
    }
}

/// Aggregated series with its forecast
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub granularity: Granularity,
    pub metric: Metric,
    pub model: ModelKind,
    pub series: Vec<TimeSeriesPoint>,
    pub forecast: Vec<ForecastResult>,
}

/// Forecast outcome for a single product
#[derive(Debug, Clone, Serialize)]
pub struct ProductForecast {
    pub product_id: i64,
    pub points: usize,
    pub forecast: Option<Vec<ForecastResult>>,
    pub error: Option<String>,
}

/// Parameters of a forecasting run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pipeline {
    pub granularity: Granularity,
    pub metric: Metric,
    pub horizon: u32,
    pub model: ModelKind,
    pub confidence: f64,
    /// Zero-fill periods without sales before forecasting
    pub fill_gaps: bool,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            metric: Metric::Revenue,
            horizon: 3,
            model: ModelKind::Linear,
            confidence: DEFAULT_CONFIDENCE,
            fill_gaps: false,
        }
    }
}

impl Pipeline {
    /// Aggregate every record into one series and forecast it
    pub fn run(&self, records: &[SaleRecord]) -> Result<PipelineOutput> {
        self.check_parameters()?;
        let series = self.series(records)?;
        let forecast = self.forecast(&series)?;
        Ok(PipelineOutput {
            granularity: self.granularity,
            metric: self.metric,
            model: self.model,
            series,
            forecast,
        })
    }

    /// Forecast the aggregated series of every product independently.
    ///
    /// Products are processed in parallel. A product whose forecast fails
    /// keeps its error message instead of aborting the others. Results are
    /// ordered by product id.
    pub fn run_per_product(&self, records: &[SaleRecord]) -> Result<Vec<ProductForecast>> {
        self.check_parameters()?;

        let mut by_product: BTreeMap<i64, Vec<SaleRecord>> = BTreeMap::new();
        for record in records {
            by_product
                .entry(record.product_id)
                .or_default()
                .push(record.clone());
        }

        let results = by_product
            .into_par_iter()
            .map(|(product_id, records)| {
                let outcome = self
                    .series(&records)
                    .and_then(|series| Ok((series.len(), self.forecast(&series)?)));

                match outcome {
                    Ok((points, forecast)) => ProductForecast {
                        product_id,
                        points,
                        forecast: Some(forecast),
                        error: None,
                    },
                    Err(e) => {
                        log::warn!("forecast for product {} failed: {}", product_id, e);
                        ProductForecast {
                            product_id,
                            points: 0,
                            forecast: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect();

        Ok(results)
    }

    /// Aggregated series for `records`, zero-filled when configured
    pub fn series(&self, records: &[SaleRecord]) -> Result<Vec<TimeSeriesPoint>> {
        let series = Aggregator::aggregate(records, self.granularity, self.metric)?;
        if self.fill_gaps {
            Ok(Aggregator::fill_gaps(&series, self.granularity))
        } else {
            Ok(series)
        }
    }

    /// Forecast an already aggregated series with the configured model
    pub fn forecast(&self, series: &[TimeSeriesPoint]) -> Result<Vec<ForecastResult>> {
        match self.model {
            ModelKind::Linear => self.forecaster::<LinearTrend>()?.forecast(series, self.horizon),
            ModelKind::Mean => self.forecaster::<MeanTrend>()?.forecast(series, self.horizon),
        }
    }

    /// Holdout evaluation of the configured model on an aggregated series
    pub fn evaluate(&self, series: &[TimeSeriesPoint], test_ratio: f64) -> Result<EvaluationReport> {
        match self.model {
            ModelKind::Linear => {
                evaluation::evaluate(&self.forecaster::<LinearTrend>()?, series, test_ratio)
            }
            ModelKind::Mean => {
                evaluation::evaluate(&self.forecaster::<MeanTrend>()?, series, test_ratio)
            }
        }
    }

    fn forecaster<M: TrendModel>(&self) -> Result<Forecaster<M>> {
        Forecaster::<M>::with_model(self.granularity).with_confidence(self.confidence)
    }

    fn check_parameters(&self) -> Result<()> {
        if self.horizon < 1 {
            return Err(SalescastError::invalid_parameter(
                "horizon",
                "must be at least 1",
            ));
        }
        self.forecaster::<LinearTrend>().map(|_| ())
    }
}
