//! Period aggregation of sale records

use std::collections::BTreeMap;

use crate::types::{
    Granularity, Metric, Result, SaleRecord, SalescastError, TimeSeriesPoint, ValidationIssue,
};

/// Groups sale records into fixed-width periods
pub struct Aggregator;

impl Aggregator {
    /// Sum `metric` per period.
    ///
    /// Every record is validated before anything is summed; the first invalid
    /// record aborts the whole call. A period total that overflows is reported
    /// against the record that pushed it past `f64::MAX`. Periods without sales are omitted, see
    /// [`Aggregator::fill_gaps`] for a dense series.
    pub fn aggregate(
        records: &[SaleRecord],
        granularity: Granularity,
        metric: Metric,
    ) -> Result<Vec<TimeSeriesPoint>> {
        let mut keyed = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let invalid = |issue| SalescastError::Validation {
                index,
                product_id: record.product_id,
                issue,
            };

            record.validate().map_err(invalid)?;

            let start = granularity
                .period_start(record.timestamp.date_naive())
                .ok_or_else(|| {
                    invalid(ValidationIssue::MalformedTimestamp(
                        record.timestamp.to_rfc3339(),
                    ))
                })?;

            let value = metric.value(record);
            if !value.is_finite() {
                return Err(invalid(ValidationIssue::NonFiniteValue(value)));
            }

            keyed.push((index, start, value));
        }

        let mut periods: BTreeMap<_, f64> = BTreeMap::new();
        for (index, start, value) in keyed {
            let sum = periods.entry(start).or_default();
            *sum += value;
            if !sum.is_finite() {
                return Err(SalescastError::Validation {
                    index,
                    product_id: records[index].product_id,
                    issue: ValidationIssue::PeriodOverflow(start),
                });
            }
        }

        Ok(periods
            .into_iter()
            .map(|(period_start, value)| TimeSeriesPoint::new(period_start, value))
            .collect())
    }

    /// Insert zero-valued points for periods missing between the first and
    /// last point of an ascending series.
    pub fn fill_gaps(series: &[TimeSeriesPoint], granularity: Granularity) -> Vec<TimeSeriesPoint> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Vec::new();
        };

        let origin = granularity.ordinal(first.period_start);
        let span = granularity.ordinal(last.period_start) - origin;
        let mut filled = Vec::with_capacity(span.max(0) as usize + 1);
        let mut observed = series.iter().peekable();

        for offset in 0..=span.max(0) {
            let Some(start) = granularity.advance(first.period_start, offset as u32) else {
                break;
            };
            match observed.peek() {
                Some(point) if point.period_start == start => {
                    filled.push(**point);
                    observed.next();
                }
                _ => filled.push(TimeSeriesPoint::new(start, 0.0)),
            }
        }

        filled
    }

    /// Sum of `metric` over all records, without grouping
    pub fn total(records: &[SaleRecord], metric: Metric) -> f64 {
        records.iter().map(|r| metric.value(r)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, TimeZone, Utc};

    fn make_record(year: i32, month: u32, day: u32, product_id: i64, quantity: i64, price: f64) -> SaleRecord {
        SaleRecord {
            timestamp: Utc.with_ymd_and_hms(year, month, day, 9, 30, 0).unwrap(),
            product_id,
            quantity,
            unit_price: price,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_records() -> Vec<SaleRecord> {
        vec![
            make_record(2024, 3, 20, 1, 2, 10.0),
            make_record(2024, 1, 5, 1, 3, 10.0),
            make_record(2024, 1, 28, 2, 1, 4.0),
            make_record(2024, 3, 2, 2, 5, 4.0),
            make_record(2024, 1, 5, 2, 2, 4.0),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_series() {
        let series = Aggregator::aggregate(&[], Granularity::Month, Metric::Revenue).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_monthly_revenue() {
        let series =
            Aggregator::aggregate(&sample_records(), Granularity::Month, Metric::Revenue).unwrap();

        assert_eq!(
            series,
            vec![
                TimeSeriesPoint::new(date(2024, 1, 1), 30.0 + 4.0 + 8.0),
                TimeSeriesPoint::new(date(2024, 3, 1), 20.0 + 20.0),
            ]
        );
    }

    #[test]
    fn test_monthly_quantity() {
        let series =
            Aggregator::aggregate(&sample_records(), Granularity::Month, Metric::Quantity).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 6.0);
        assert_eq!(series[1].value, 7.0);
    }

    #[test]
    fn test_daily_groups_same_day() {
        let series =
            Aggregator::aggregate(&sample_records(), Granularity::Day, Metric::Quantity).unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series[0], TimeSeriesPoint::new(date(2024, 1, 5), 5.0));
    }

    #[test]
    fn test_weekly_groups_by_monday() {
        let records = vec![
            make_record(2024, 3, 18, 1, 1, 1.0), // Monday
            make_record(2024, 3, 24, 1, 2, 1.0), // Sunday, same week
            make_record(2024, 3, 25, 1, 4, 1.0), // next Monday
        ];
        let series = Aggregator::aggregate(&records, Granularity::Week, Metric::Quantity).unwrap();

        assert_eq!(
            series,
            vec![
                TimeSeriesPoint::new(date(2024, 3, 18), 3.0),
                TimeSeriesPoint::new(date(2024, 3, 25), 4.0),
            ]
        );
    }

    #[test]
    fn test_output_strictly_ascending() {
        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            let series =
                Aggregator::aggregate(&sample_records(), granularity, Metric::Revenue).unwrap();
            assert!(series
                .windows(2)
                .all(|w| w[0].period_start < w[1].period_start));
        }
    }

    #[test]
    fn test_conservation_of_metric() {
        let records = sample_records();
        for granularity in [Granularity::Day, Granularity::Week, Granularity::Month] {
            for metric in [Metric::Quantity, Metric::Revenue] {
                let series = Aggregator::aggregate(&records, granularity, metric).unwrap();
                let per_period: f64 = series.iter().map(|p| p.value).sum();
                let expected = Aggregator::total(&records, metric);
                assert!((per_period - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut records = sample_records();
        records.push(make_record(2024, 2, 1, 7, -3, 1.0));

        let err = Aggregator::aggregate(&records, Granularity::Month, Metric::Revenue).unwrap_err();

        match err {
            SalescastError::Validation {
                index,
                product_id,
                issue,
            } => {
                assert_eq!(index, 5);
                assert_eq!(product_id, 7);
                assert_eq!(issue, ValidationIssue::NegativeQuantity(-3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_price_rejected_first_record() {
        let records = vec![make_record(2024, 2, 1, 3, 1, -2.0)];
        let err = Aggregator::aggregate(&records, Granularity::Day, Metric::Quantity).unwrap_err();
        assert!(matches!(
            err,
            SalescastError::Validation { index: 0, product_id: 3, .. }
        ));
    }

    #[test]
    fn test_overflowing_revenue_rejected() {
        let records = vec![
            make_record(2024, 1, 3, 1, 2, 10.0),
            make_record(2024, 1, 4, 2, i64::MAX, f64::MAX),
        ];

        let err = Aggregator::aggregate(&records, Granularity::Month, Metric::Revenue).unwrap_err();
        assert!(matches!(
            err,
            SalescastError::Validation {
                index: 1,
                product_id: 2,
                issue: ValidationIssue::NonFiniteValue(v),
            } if v.is_infinite()
        ));

        // The same record is fine when only units are summed
        assert!(Aggregator::aggregate(&records, Granularity::Month, Metric::Quantity).is_ok());
    }

    #[test]
    fn test_overflowing_period_total_rejected() {
        let records = vec![
            make_record(2024, 1, 3, 1, 1, 1e308),
            make_record(2024, 2, 3, 1, 1, 1e308),
            make_record(2024, 1, 9, 2, 1, 1e308),
        ];

        let err = Aggregator::aggregate(&records, Granularity::Month, Metric::Revenue).unwrap_err();
        match err {
            SalescastError::Validation {
                index,
                product_id,
                issue,
            } => {
                assert_eq!(index, 2);
                assert_eq!(product_id, 2);
                assert_eq!(issue, ValidationIssue::PeriodOverflow(date(2024, 1, 1)));
            }
            other => panic!("unexpected error: {other}"),
        }

        // Split across days, every total stays finite
        let daily = Aggregator::aggregate(&records, Granularity::Day, Metric::Revenue).unwrap();
        assert!(daily.iter().all(|p| p.value.is_finite()));
    }

    #[test]
    fn test_unrepresentable_week_rejected() {
        let records = vec![SaleRecord {
            timestamp: NaiveDate::MIN.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            product_id: 1,
            quantity: 1,
            unit_price: 1.0,
        }];
        let result = Aggregator::aggregate(&records, Granularity::Week, Metric::Quantity);
        // NaiveDate::MIN is not a Monday, so its week starts before the representable range
        if NaiveDate::MIN.weekday() != chrono::Weekday::Mon {
            assert!(matches!(
                result,
                Err(SalescastError::Validation {
                    issue: ValidationIssue::MalformedTimestamp(_),
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_fill_gaps_inserts_zero_periods() {
        let series =
            Aggregator::aggregate(&sample_records(), Granularity::Month, Metric::Quantity).unwrap();
        let filled = Aggregator::fill_gaps(&series, Granularity::Month);

        assert_eq!(
            filled,
            vec![
                TimeSeriesPoint::new(date(2024, 1, 1), 6.0),
                TimeSeriesPoint::new(date(2024, 2, 1), 0.0),
                TimeSeriesPoint::new(date(2024, 3, 1), 7.0),
            ]
        );
    }

    #[test]
    fn test_fill_gaps_empty_and_dense() {
        assert!(Aggregator::fill_gaps(&[], Granularity::Day).is_empty());

        let dense = vec![
            TimeSeriesPoint::new(date(2024, 1, 1), 1.0),
            TimeSeriesPoint::new(date(2024, 1, 2), 2.0),
        ];
        assert_eq!(Aggregator::fill_gaps(&dense, Granularity::Day), dense);
    }
}
