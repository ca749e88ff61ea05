//! Dashboard views and the bar that switches between them

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

const HINT: &str = "←/→ switch · q quit";
const GAP: u16 = 2;

/// Dashboard views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Forecast,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Overview, Tab::Forecast];

    pub fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Forecast => "Forecast",
        }
    }

    /// Digit key that jumps to this view
    pub fn shortcut(self) -> char {
        match self {
            Self::Overview => '1',
            Self::Forecast => '2',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.shortcut() == key)
    }

    pub fn next(self) -> Self {
        match self {
            Self::Overview => Self::Forecast,
            Self::Forecast => Self::Overview,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Overview => Self::Forecast,
            Self::Forecast => Self::Overview,
        }
    }

    /// Text drawn for this tab in the bar, e.g. `1 Overview`
    fn title(self) -> String {
        format!("{} {}", self.shortcut(), self.label())
    }
}

/// Tab bar: numbered view titles on the left, key hint on the right,
/// separator rule underneath
pub struct TabBar {
    selected: Tab,
}

impl TabBar {
    pub fn new(selected: Tab) -> Self {
        Self { selected }
    }

    /// Column offset of every title that fits in `width`. The selected title
    /// is wrapped in brackets.
    pub fn title_positions(&self, width: u16) -> Vec<(Tab, u16, String)> {
        let mut x = 1;
        let mut placed = Vec::new();

        for tab in Tab::ALL {
            let title = if tab == self.selected {
                format!("[{}]", tab.title())
            } else {
                tab.title()
            };
            let len = title.chars().count() as u16;
            if x + len > width {
                break;
            }
            placed.push((tab, x, title));
            x += len + GAP;
        }

        placed
    }
}

impl Widget for TabBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let positions = self.title_positions(area.width);
        let titles_end = positions
            .last()
            .map(|(_, x, title)| x + title.chars().count() as u16)
            .unwrap_or(0);

        for (tab, x, title) in &positions {
            let style = if *tab == self.selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            buf.set_string(area.x + x, area.y, title, style);
        }

        let hint_len = HINT.chars().count() as u16;
        if titles_end + GAP + hint_len + 1 <= area.width {
            let x = area.x + area.width - hint_len - 1;
            buf.set_string(x, area.y, HINT, Style::default().fg(Color::DarkGray));
        }

        if area.height > 1 {
            let rule = "─".repeat(area.width as usize);
            buf.set_string(area.x, area.y + 1, rule, Style::default().fg(Color::DarkGray));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_tab_next_prev_wrap() {
        assert_eq!(Tab::Overview.next(), Tab::Forecast);
        assert_eq!(Tab::Forecast.next(), Tab::Overview);
        assert_eq!(Tab::Overview.prev(), Tab::Forecast);
        assert_eq!(Tab::Forecast.prev(), Tab::Overview);
        assert_eq!(Tab::default(), Tab::Overview);
    }

    #[test]
    fn test_shortcuts() {
        assert_eq!(Tab::from_shortcut('1'), Some(Tab::Overview));
        assert_eq!(Tab::from_shortcut('2'), Some(Tab::Forecast));
        assert_eq!(Tab::from_shortcut('3'), None);
    }

    #[test]
    fn test_title_positions() {
        let positions = TabBar::new(Tab::Overview).title_positions(80);
        assert_eq!(
            positions,
            vec![
                (Tab::Overview, 1, "[1 Overview]".to_string()),
                (Tab::Forecast, 15, "2 Forecast".to_string()),
            ]
        );
    }

    #[test]
    fn test_title_positions_drop_what_does_not_fit() {
        let positions = TabBar::new(Tab::Forecast).title_positions(16);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].0, Tab::Overview);
    }

    #[test]
    fn test_tab_bar_marks_selected_and_hints() {
        let area = Rect::new(0, 0, 60, 2);
        let mut buf = Buffer::empty(area);
        TabBar::new(Tab::Forecast).render(area, &mut buf);

        let top = row(&buf, 0);
        assert!(top.contains("[2 Forecast]"));
        assert!(top.contains("1 Overview"));
        assert!(!top.contains("[1 Overview]"));
        assert!(top.trim_end().ends_with(HINT));
        assert!(row(&buf, 1).starts_with("──"));
    }

    #[test]
    fn test_tab_bar_hides_hint_when_narrow() {
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        TabBar::new(Tab::Overview).render(area, &mut buf);

        let top = row(&buf, 0);
        assert!(top.contains("[1 Overview]"));
        assert!(!top.contains("quit"));
    }
}
