//! Holdout evaluation of a trend model
//!
//! Splits a series chronologically: the model is fit on the head and scored
//! on the held-out tail.

use serde::Serialize;

use super::forecaster::{Forecaster, TrendModel};
use crate::types::{Result, SalescastError, TimeSeriesPoint};

/// Default share of the series held out for scoring
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Error metrics for held-out periods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub model: String,
    pub train_points: usize,
    pub test_points: usize,
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
}

/// Mean absolute error
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    sum / actual.len() as f64
}

/// Mean squared error
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() || actual.is_empty() {
        return f64::NAN;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    sum / actual.len() as f64
}

/// Root mean squared error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Number of trailing points held out: `ceil(len * ratio)`, at least one
pub fn holdout_size(len: usize, test_ratio: f64) -> usize {
    ((len as f64 * test_ratio).ceil() as usize).max(1)
}

/// Fit on the head of `series`, score predictions for the held-out tail
pub fn evaluate<M: TrendModel>(
    forecaster: &Forecaster<M>,
    series: &[TimeSeriesPoint],
    test_ratio: f64,
) -> Result<EvaluationReport> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(SalescastError::invalid_parameter(
            "test_ratio",
            format!("{} is not between 0 and 1", test_ratio),
        ));
    }

    // The whole series is checked, not just the training head. Length is
    // reported below with the holdout included.
    match forecaster.check_series(series) {
        Ok(()) | Err(SalescastError::InsufficientData { .. }) => {}
        Err(e) => return Err(e),
    }

    let test_points = holdout_size(series.len(), test_ratio);
    let train_points = series.len().saturating_sub(test_points);
    if train_points < M::MIN_POINTS {
        return Err(SalescastError::InsufficientData {
            required: M::MIN_POINTS + test_points,
            actual: series.len(),
        });
    }

    let (train, test) = series.split_at(train_points);
    let fitted = forecaster.fit(train)?;

    let actual: Vec<f64> = test.iter().map(|p| p.value).collect();
    let predicted: Vec<f64> = test
        .iter()
        .map(|p| fitted.predict(p.period_start).value)
        .collect();

    Ok(EvaluationReport {
        model: fitted.model().name().to_string(),
        train_points,
        test_points,
        mae: mae(&actual, &predicted),
        mse: mse(&actual, &predicted),
        rmse: rmse(&actual, &predicted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::forecaster::MeanTrend;
    use crate::types::Granularity;
    use chrono::NaiveDate;

    fn monthly(values: &[f64]) -> Vec<TimeSeriesPoint> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                TimeSeriesPoint::new(
                    Granularity::Month.advance(start, i as u32).unwrap(),
                    v,
                )
            })
            .collect()
    }

    #[test]
    fn test_metrics() {
        let actual = [1.0, 2.0, 3.0];
        let predicted = [2.0, 2.0, 1.0];
        assert!((mae(&actual, &predicted) - 1.0).abs() < 1e-10);
        assert!((mse(&actual, &predicted) - 5.0 / 3.0).abs() < 1e-10);
        assert!((rmse(&actual, &predicted) - (5.0_f64 / 3.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_metrics_mismatched_lengths() {
        assert!(mae(&[1.0], &[]).is_nan());
        assert!(mse(&[], &[]).is_nan());
    }

    #[test]
    fn test_holdout_size() {
        assert_eq!(holdout_size(10, 0.2), 2);
        assert_eq!(holdout_size(11, 0.2), 3);
        assert_eq!(holdout_size(3, 0.1), 1);
    }

    #[test]
    fn test_evaluate_perfect_trend() {
        let series = monthly(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let report = evaluate(&Forecaster::new(Granularity::Month), &series, 0.2).unwrap();

        assert_eq!(report.model, "linear");
        assert_eq!(report.train_points, 4);
        assert_eq!(report.test_points, 1);
        assert!(report.mae.abs() < 1e-9);
        assert!(report.rmse.abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_metrics_non_negative() {
        let series = monthly(&[10.0, 25.0, 15.0, 30.0, 22.0, 41.0, 35.0, 50.0]);
        let report = evaluate(&Forecaster::new(Granularity::Month), &series, 0.25).unwrap();

        assert_eq!(report.test_points, 2);
        assert!(report.mae >= 0.0);
        assert!(report.mse >= 0.0);
        assert!((report.rmse - report.mse.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_evaluate_with_mean_model() {
        let series = monthly(&[10.0, 10.0, 10.0, 10.0]);
        let forecaster = Forecaster::<MeanTrend>::with_model(Granularity::Month);
        let report = evaluate(&forecaster, &series, 0.25).unwrap();
        assert_eq!(report.model, "mean");
        assert_eq!(report.mae, 0.0);
    }

    #[test]
    fn test_evaluate_invalid_ratio() {
        let series = monthly(&[1.0, 2.0, 3.0]);
        for ratio in [0.0, 1.0, -0.5, f64::NAN] {
            let err = evaluate(&Forecaster::new(Granularity::Month), &series, ratio).unwrap_err();
            assert!(matches!(err, SalescastError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_evaluate_rejects_out_of_order_tail() {
        let mut series = monthly(&[1.0, 2.0, 3.0]);
        series.push(TimeSeriesPoint::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 999.0));

        let err = evaluate(&Forecaster::new(Granularity::Month), &series, 0.25).unwrap_err();
        assert!(matches!(err, SalescastError::InvalidParameter { ref name, .. } if name == "series"));
    }

    #[test]
    fn test_evaluate_rejects_unaligned_tail() {
        let mut series = monthly(&[1.0, 2.0, 3.0]);
        series.push(TimeSeriesPoint::new(NaiveDate::from_ymd_opt(2024, 4, 17).unwrap(), 4.0));

        let err = evaluate(&Forecaster::new(Granularity::Month), &series, 0.25).unwrap_err();
        assert!(matches!(err, SalescastError::InvalidParameter { ref name, .. } if name == "series"));
    }

    #[test]
    fn test_evaluate_single_point_reports_holdout() {
        let series = monthly(&[1.0]);
        let err = evaluate(&Forecaster::new(Granularity::Month), &series, 0.2).unwrap_err();
        assert!(matches!(
            err,
            SalescastError::InsufficientData { required: 3, actual: 1 }
        ));
    }

    #[test]
    fn test_evaluate_too_short() {
        let series = monthly(&[1.0, 2.0]);
        let err = evaluate(&Forecaster::new(Granularity::Month), &series, 0.2).unwrap_err();
        assert!(matches!(
            err,
            SalescastError::InsufficientData { required: 3, actual: 2 }
        ));
    }
}
