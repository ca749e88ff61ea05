//! Overview layout widget

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::chart::TrendChart;
use crate::types::{ForecastResult, Granularity, Metric, TimeSeriesPoint};

/// Format a number with thousand separators (e.g., 1234567 -> "1,234,567")
pub fn format_number(n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let chars: Vec<char> = s.chars().collect();

    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }

    result
}

/// Format an amount with two decimals and thousand separators
/// (e.g., -1234.5 -> "-1,234.50")
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, format_number(cents / 100), cents % 100)
}

/// Series title, e.g. "Monthly revenue"
pub fn series_title(granularity: Granularity, metric: Metric) -> String {
    let period = match granularity {
        Granularity::Day => "Daily",
        Granularity::Week => "Weekly",
        Granularity::Month => "Monthly",
    };
    format!("{} {}", period, metric)
}

/// Store-wide totals shown in the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesTotals {
    pub revenue: f64,
    pub units: u64,
    pub products: usize,
    pub sales: usize,
}

/// Overview widget combining all elements
pub struct Overview<'a> {
    totals: &'a SalesTotals,
    series: &'a [TimeSeriesPoint],
    forecast: Result<&'a [ForecastResult], &'a str>,
    granularity: Granularity,
    metric: Metric,
}

impl<'a> Overview<'a> {
    pub fn new(
        totals: &'a SalesTotals,
        series: &'a [TimeSeriesPoint],
        forecast: Result<&'a [ForecastResult], &'a str>,
        granularity: Granularity,
        metric: Metric,
    ) -> Self {
        Self {
            totals,
            series,
            forecast,
            granularity,
            metric,
        }
    }
}

impl Widget for Overview<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::vertical([
            Constraint::Length(2), // Header
            Constraint::Min(4),    // Chart
            Constraint::Length(2), // Footer
        ])
        .split(area);

        self.render_header(chunks[0], buf);

        let forecast = self.forecast.unwrap_or(&[]);
        TrendChart::new(self.series, forecast, self.granularity).render(chunks[1], buf);

        self.render_footer(chunks[2], buf);
    }
}

impl Overview<'_> {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            "salescast - Revenue: {} | Units: {}",
            format_amount(self.totals.revenue),
            format_number(self.totals.units)
        );

        let mut subtitle = format!(
            "Products: {} | Sales: {} | {}",
            self.totals.products,
            format_number(self.totals.sales as u64),
            series_title(self.granularity, self.metric)
        );
        if let (Some(first), Some(last)) = (self.series.first(), self.series.last()) {
            subtitle.push_str(&format!(
                " {} .. {}",
                self.granularity.label(first.period_start),
                self.granularity.label(last.period_start)
            ));
        }

        let header = Paragraph::new(vec![
            Line::from(Span::styled(title, Style::default().fg(Color::Cyan))),
            Line::from(Span::styled(subtitle, Style::default().fg(Color::DarkGray))),
        ]);

        header.render(area, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let next = match self.forecast {
            Ok(forecast) => match forecast.first() {
                Some(f) => Span::styled(
                    format!(
                        "Next {}: {} ± {}",
                        self.granularity.label(f.period),
                        format_amount(f.predicted_value),
                        format_amount(f.error_margin)
                    ),
                    Style::default().fg(Color::Green),
                ),
                None => Span::raw(""),
            },
            Err(message) => Span::styled(
                format!("No forecast: {}", message),
                Style::default().fg(Color::Yellow),
            ),
        };

        let footer = Paragraph::new(vec![
            Line::from(next),
            Line::from(Span::styled(
                "Tab: switch view | q: quit",
                Style::default().fg(Color::DarkGray),
            )),
        ]);

        footer.render(area, buf);
    }
}
