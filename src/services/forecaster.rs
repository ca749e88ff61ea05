//! Trend fitting and extrapolation over an aggregated series
//!
//! The forecaster maps every period to its offset from the first observed
//! period (so gaps keep their real spacing), fits a [`TrendModel`] over
//! `(offset, value)` pairs and extrapolates the periods that follow the last
//! observation. The default model is ordinary least squares over the period
//! offset ([`LinearTrend`]).

use std::marker::PhantomData;

use chrono::NaiveDate;

use crate::types::{ForecastResult, Granularity, Result, SalescastError, TimeSeriesPoint};

/// Default confidence level for error margins
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Point prediction with its standard error
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub value: f64,
    pub std_error: f64,
}

/// A deterministic model fit to `(x, y)` pairs
pub trait TrendModel: Sized {
    /// Smallest number of points `fit` accepts
    const MIN_POINTS: usize;

    fn name(&self) -> &'static str;

    /// Fit to points with strictly increasing `x`
    fn fit(points: &[(f64, f64)]) -> Result<Self>;

    fn predict(&self, x: f64) -> Prediction;
}

/// Least squares line: y = intercept + slope * x
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTrend {
    intercept: f64,
    slope: f64,
    n_observations: usize,
    mean_x: f64,
    /// Sum of squared deviations of x
    sxx: f64,
    /// Residual variance (SSE / (n - 2)), zero for an exact fit
    residual_variance: f64,
    r_squared: f64,
}

impl LinearTrend {
    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }
}

impl TrendModel for LinearTrend {
    const MIN_POINTS: usize = 2;

    fn name(&self) -> &'static str {
        "linear"
    }

    fn fit(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() < Self::MIN_POINTS {
            return Err(SalescastError::InsufficientData {
                required: Self::MIN_POINTS,
                actual: points.len(),
            });
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        let sxy: f64 = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();

        if sxx.abs() < 1e-10 {
            return Err(SalescastError::invalid_parameter(
                "series",
                "period offsets do not vary",
            ));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let ss_res: f64 = points
            .iter()
            .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
            .sum();
        let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();

        let dof = points.len().saturating_sub(2);
        let residual_variance = if dof > 0 { ss_res / dof as f64 } else { 0.0 };
        let r_squared = if ss_tot > 1e-10 {
            1.0 - ss_res / ss_tot
        } else {
            1.0
        };

        Ok(Self {
            intercept,
            slope,
            n_observations: points.len(),
            mean_x,
            sxx,
            residual_variance,
            r_squared,
        })
    }

    fn predict(&self, x: f64) -> Prediction {
        let n = self.n_observations as f64;
        let leverage = 1.0 + 1.0 / n + (x - self.mean_x).powi(2) / self.sxx;
        Prediction {
            value: self.intercept + self.slope * x,
            std_error: (self.residual_variance * leverage).sqrt(),
        }
    }
}

/// Flat baseline: predicts the historical mean everywhere
#[derive(Debug, Clone, PartialEq)]
pub struct MeanTrend {
    mean: f64,
    n_observations: usize,
    /// Sample variance of the observations
    variance: f64,
}

impl TrendModel for MeanTrend {
    const MIN_POINTS: usize = 2;

    fn name(&self) -> &'static str {
        "mean"
    }

    fn fit(points: &[(f64, f64)]) -> Result<Self> {
        if points.len() < Self::MIN_POINTS {
            return Err(SalescastError::InsufficientData {
                required: Self::MIN_POINTS,
                actual: points.len(),
            });
        }

        let n = points.len() as f64;
        let mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;
        let variance = points.iter().map(|(_, y)| (y - mean).powi(2)).sum::<f64>() / (n - 1.0);

        Ok(Self {
            mean,
            n_observations: points.len(),
            variance,
        })
    }

    fn predict(&self, _x: f64) -> Prediction {
        let n = self.n_observations as f64;
        Prediction {
            value: self.mean,
            std_error: (self.variance * (1.0 + 1.0 / n)).sqrt(),
        }
    }
}

/// Approximate two-sided z-score, rounded down to the nearest tabulated level
pub fn z_score(confidence: f64) -> f64 {
    match confidence {
        c if c >= 0.99 => 2.576,
        c if c >= 0.95 => 1.96,
        c if c >= 0.90 => 1.645,
        c if c >= 0.80 => 1.282,
        _ => 0.674,
    }
}

/// A trend model bound to the periods it was fit on
#[derive(Debug, Clone)]
pub struct FittedTrend<M> {
    model: M,
    granularity: Granularity,
    origin: i64,
    last_period: NaiveDate,
    z: f64,
}

impl<M: TrendModel> FittedTrend<M> {
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn last_period(&self) -> NaiveDate {
        self.last_period
    }

    /// Prediction for the period starting at `period`
    pub fn predict(&self, period: NaiveDate) -> Prediction {
        let x = (self.granularity.ordinal(period) - self.origin) as f64;
        self.model.predict(x)
    }

    /// Margin for a standard error at the configured confidence
    pub fn margin(&self, prediction: &Prediction) -> f64 {
        self.z * prediction.std_error
    }
}

/// Fits `M` to a series and extrapolates future periods
#[derive(Debug, Clone)]
pub struct Forecaster<M = LinearTrend> {
    granularity: Granularity,
    confidence: f64,
    model: PhantomData<M>,
}

impl Forecaster {
    /// Linear trend forecaster
    pub fn new(granularity: Granularity) -> Self {
        Self::with_model(granularity)
    }
}

impl<M: TrendModel> Forecaster<M> {
    pub fn with_model(granularity: Granularity) -> Self {
        Self {
            granularity,
            confidence: DEFAULT_CONFIDENCE,
            model: PhantomData,
        }
    }

    /// Set the confidence level used for error margins (0 < level < 1)
    pub fn with_confidence(mut self, confidence: f64) -> Result<Self> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(SalescastError::invalid_parameter(
                "confidence",
                format!("{} is not between 0 and 1", confidence),
            ));
        }
        self.confidence = confidence;
        Ok(self)
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Fit the model without predicting anything
    pub fn fit(&self, series: &[TimeSeriesPoint]) -> Result<FittedTrend<M>> {
        self.check_series(series)?;

        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(SalescastError::InsufficientData {
                required: M::MIN_POINTS,
                actual: 0,
            });
        };

        let origin = self.granularity.ordinal(first.period_start);
        let points: Vec<(f64, f64)> = series
            .iter()
            .map(|p| {
                let x = (self.granularity.ordinal(p.period_start) - origin) as f64;
                (x, p.value)
            })
            .collect();

        let model = M::fit(&points)?;
        log::debug!(
            "fit {} trend over {} {} periods",
            model.name(),
            series.len(),
            self.granularity
        );

        Ok(FittedTrend {
            model,
            granularity: self.granularity,
            origin,
            last_period: last.period_start,
            z: z_score(self.confidence),
        })
    }

    /// Predict the `horizon` periods following the last point of `series`
    pub fn forecast(&self, series: &[TimeSeriesPoint], horizon: u32) -> Result<Vec<ForecastResult>> {
        if horizon < 1 {
            return Err(SalescastError::invalid_parameter(
                "horizon",
                "must be at least 1",
            ));
        }

        let fitted = self.fit(series)?;

        (1..=horizon)
            .map(|step| {
                let period = self
                    .granularity
                    .advance(fitted.last_period, step)
                    .ok_or_else(|| {
                        SalescastError::invalid_parameter(
                            "horizon",
                            "extends past the supported date range",
                        )
                    })?;
                let prediction = fitted.predict(period);
                Ok(ForecastResult {
                    period,
                    step,
                    predicted_value: prediction.value,
                    error_margin: fitted.margin(&prediction),
                })
            })
            .collect()
    }

    /// Series must be aligned to the granularity, strictly ascending, finite
    /// and long enough for the model.
    pub(crate) fn check_series(&self, series: &[TimeSeriesPoint]) -> Result<()> {
        if let Some(point) = series
            .iter()
            .find(|p| self.granularity.period_start(p.period_start) != Some(p.period_start))
        {
            return Err(SalescastError::invalid_parameter(
                "series",
                format!(
                    "{} is not the start of a {} period",
                    point.period_start, self.granularity
                ),
            ));
        }

        if series
            .windows(2)
            .any(|w| w[0].period_start >= w[1].period_start)
        {
            return Err(SalescastError::invalid_parameter(
                "series",
                "periods must be strictly ascending",
            ));
        }

        if let Some(point) = series.iter().find(|p| !p.value.is_finite()) {
            return Err(SalescastError::invalid_parameter(
                "series",
                format!("{} at {} is not a finite value", point.value, point.period_start),
            ));
        }

        if series.len() < M::MIN_POINTS {
            return Err(SalescastError::InsufficientData {
                required: M::MIN_POINTS,
                actual: series.len(),
            });
        }

        Ok(())
    }
}
