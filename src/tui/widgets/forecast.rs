//! Forecast table widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::overview::{format_amount, series_title};
use crate::types::{ForecastResult, Granularity, Metric};

pub struct ForecastTable<'a> {
    forecast: Result<&'a [ForecastResult], &'a str>,
    granularity: Granularity,
    metric: Metric,
    confidence: f64,
}

impl<'a> ForecastTable<'a> {
    pub fn new(
        forecast: Result<&'a [ForecastResult], &'a str>,
        granularity: Granularity,
        metric: Metric,
        confidence: f64,
    ) -> Self {
        Self {
            forecast,
            granularity,
            metric,
            confidence,
        }
    }

    fn row(cells: [&str; 5]) -> String {
        format!(
            "{:<10} {:>14} {:>12} {:>14} {:>14}",
            cells[0], cells[1], cells[2], cells[3], cells[4]
        )
    }
}

impl Widget for ForecastTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            "{} forecast ({:.0}% interval)",
            series_title(self.granularity, self.metric),
            self.confidence * 100.0
        );
        let mut lines = vec![
            Line::from(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::raw(""),
        ];

        match self.forecast {
            Ok(forecast) => {
                lines.push(Line::from(Span::styled(
                    Self::row(["Period", "Predicted", "± Margin", "Lower", "Upper"]),
                    Style::default().fg(Color::DarkGray),
                )));
                for result in forecast {
                    let period = self.granularity.label(result.period);
                    let predicted = format_amount(result.predicted_value);
                    let margin = format_amount(result.error_margin);
                    let lower = format_amount(result.lower());
                    let upper = format_amount(result.upper());
                    lines.push(Line::from(Span::styled(
                        Self::row([&period, &predicted, &margin, &lower, &upper]),
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
            Err(message) => lines.push(Line::from(Span::styled(
                format!("No forecast: {}", message),
                Style::default().fg(Color::Yellow),
            ))),
        }

        Paragraph::new(lines).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_render_rows() {
        let forecast = vec![
            ForecastResult {
                period: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                step: 1,
                predicted_value: 40.0,
                error_margin: 2.5,
            },
            ForecastResult {
                period: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                step: 2,
                predicted_value: 50.0,
                error_margin: 3.0,
            },
        ];
        let area = Rect::new(0, 0, 80, 6);
        let mut buf = Buffer::empty(area);
        ForecastTable::new(
            Ok(forecast.as_slice()),
            Granularity::Month,
            Metric::Quantity,
            0.95,
        )
        .render(area, &mut buf);

        assert!(row(&buf, 0).contains("Monthly quantity forecast (95% interval)"));
        assert!(row(&buf, 2).contains("Predicted"));
        let first = row(&buf, 3);
        assert!(first.starts_with("2024-04"));
        assert!(first.contains("40.00"));
        assert!(first.contains("37.50"));
        assert!(first.contains("42.50"));
        assert!(row(&buf, 4).starts_with("2024-05"));
    }

    #[test]
    fn test_render_error() {
        let area = Rect::new(0, 0, 60, 4);
        let mut buf = Buffer::empty(area);
        ForecastTable::new(
            Err("Insufficient data"),
            Granularity::Week,
            Metric::Revenue,
            0.9,
        )
        .render(area, &mut buf);

        assert!(row(&buf, 2).contains("No forecast: Insufficient data"));
    }
}
