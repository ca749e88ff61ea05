//! Bar chart of the aggregated series followed by its forecast

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::types::{ForecastResult, Granularity, TimeSeriesPoint};

/// Partial block characters, indexed by eighths filled
const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Columns per bar, including the gap
const BAR_STRIDE: u16 = 3;
const BAR_WIDTH: usize = 2;

/// One column of the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub label_date: chrono::NaiveDate,
    pub value: f64,
    pub forecast: bool,
}

impl Bar {
    fn color(self) -> Color {
        if self.forecast {
            Color::Yellow
        } else {
            Color::Cyan
        }
    }
}

/// Bar height in eighths of a row, for `rows` rows of plot
pub fn bar_eighths(value: f64, max: f64, rows: u16) -> u32 {
    if !value.is_finite() || !max.is_finite() || value <= 0.0 || max <= 0.0 {
        return 0;
    }
    let full = u32::from(rows) * 8;
    ((value / max) * f64::from(full)).round().min(f64::from(full)) as u32
}

/// Series then forecast bars, keeping every forecast bar and the most recent
/// history that fits in `capacity`
pub fn build_bars(
    series: &[TimeSeriesPoint],
    forecast: &[ForecastResult],
    capacity: usize,
) -> Vec<Bar> {
    let forecast_bars = forecast.iter().take(capacity).map(|f| Bar {
        label_date: f.period,
        value: f.predicted_value.max(0.0),
        forecast: true,
    });
    let history_room = capacity.saturating_sub(forecast.len());
    let skip = series.len().saturating_sub(history_room);

    series[skip..]
        .iter()
        .map(|p| Bar {
            label_date: p.period_start,
            value: p.value.max(0.0),
            forecast: false,
        })
        .chain(forecast_bars)
        .collect()
}

pub struct TrendChart<'a> {
    series: &'a [TimeSeriesPoint],
    forecast: &'a [ForecastResult],
    granularity: Granularity,
}

impl<'a> TrendChart<'a> {
    pub fn new(
        series: &'a [TimeSeriesPoint],
        forecast: &'a [ForecastResult],
        granularity: Granularity,
    ) -> Self {
        Self {
            series,
            forecast,
            granularity,
        }
    }
}

impl Widget for TrendChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 3 || area.width < BAR_STRIDE {
            return;
        }

        if self.series.is_empty() {
            let text = "No sales recorded";
            let x = area.x + area.width.saturating_sub(text.len() as u16) / 2;
            buf.set_string(
                x,
                area.y + area.height / 2,
                text,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        // Bottom row holds the period labels
        let rows = area.height - 1;
        let capacity = usize::from(area.width / BAR_STRIDE);
        let bars = build_bars(self.series, self.forecast, capacity);
        let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);

        for (i, bar) in bars.iter().enumerate() {
            let x = area.x + i as u16 * BAR_STRIDE;
            let style = Style::default().fg(bar.color());
            let mut remaining = bar_eighths(bar.value, max, rows);

            for row in 0..rows {
                if remaining == 0 {
                    break;
                }
                let filled = remaining.min(8);
                remaining -= filled;
                let y = area.y + rows - 1 - row;
                let cell = BLOCKS[filled as usize].to_string().repeat(BAR_WIDTH);
                buf.set_string(x, y, &cell, style);
            }
        }

        self.render_labels(&bars, area, buf);
    }
}

impl TrendChart<'_> {
    fn render_labels(&self, bars: &[Bar], area: Rect, buf: &mut Buffer) {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return;
        };
        let y = area.y + area.height - 1;
        let style = Style::default().fg(Color::DarkGray);

        let first_label = self.granularity.label(first.label_date);
        buf.set_string(area.x, y, &first_label, style);

        let last_label = self.granularity.label(last.label_date);
        let last_len = last_label.len() as u16;
        if bars.len() > 1 && first_label.len() as u16 + 1 + last_len <= area.width {
            buf.set_string(area.x + area.width - last_len, y, &last_label, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn series(values: &[f64]) -> Vec<TimeSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint::new(month(i as u32 + 1), *v))
            .collect()
    }

    fn forecast(start: u32, values: &[f64]) -> Vec<ForecastResult> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ForecastResult {
                period: month(start + i as u32),
                step: i as u32 + 1,
                predicted_value: *v,
                error_margin: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_bar_eighths_scaling() {
        assert_eq!(bar_eighths(10.0, 10.0, 4), 32);
        assert_eq!(bar_eighths(5.0, 10.0, 4), 16);
        assert_eq!(bar_eighths(1.0, 10.0, 1), 1);
    }

    #[test]
    fn test_bar_eighths_degenerate() {
        assert_eq!(bar_eighths(0.0, 10.0, 4), 0);
        assert_eq!(bar_eighths(-3.0, 10.0, 4), 0);
        assert_eq!(bar_eighths(3.0, 0.0, 4), 0);
        assert_eq!(bar_eighths(f64::NAN, 10.0, 4), 0);
    }

    #[test]
    fn test_build_bars_history_then_forecast() {
        let bars = build_bars(&series(&[1.0, 2.0]), &forecast(3, &[3.0]), 10);
        assert_eq!(bars.len(), 3);
        assert!(!bars[0].forecast);
        assert!(bars[2].forecast);
        assert_eq!(bars[2].label_date, month(3));
    }

    #[test]
    fn test_build_bars_drops_oldest_history() {
        let bars = build_bars(
            &series(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            &forecast(6, &[6.0, 7.0]),
            4,
        );
        let values: Vec<f64> = bars.iter().map(|b| b.value).collect();
        assert_eq!(values, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_build_bars_clamps_negative_forecast() {
        let bars = build_bars(&series(&[2.0]), &forecast(2, &[-5.0]), 4);
        assert_eq!(bars[1].value, 0.0);
    }

    #[test]
    fn test_render_tallest_bar_reaches_top() {
        let data = series(&[2.0, 4.0]);
        let area = Rect::new(0, 0, 12, 5);
        let mut buf = Buffer::empty(area);
        TrendChart::new(&data, &[], Granularity::Month).render(area, &mut buf);

        // Second bar starts at column 3 and fills all four plot rows
        assert_eq!(buf[(3, 0)].symbol(), "█");
        assert_eq!(buf[(3, 3)].symbol(), "█");
        // First bar is half height
        assert_eq!(buf[(0, 1)].symbol(), " ");
        assert_eq!(buf[(0, 2)].symbol(), "█");
    }

    #[test]
    fn test_render_labels() {
        let data = series(&[1.0, 2.0, 3.0]);
        let area = Rect::new(0, 0, 20, 4);
        let mut buf = Buffer::empty(area);
        TrendChart::new(&data, &forecast(4, &[4.0]), Granularity::Month).render(area, &mut buf);

        let labels: String = (0..area.width)
            .map(|x| buf[(x, 3)].symbol().to_string())
            .collect();
        assert!(labels.starts_with("2024-01"));
        assert!(labels.ends_with("2024-04"));
    }
}
