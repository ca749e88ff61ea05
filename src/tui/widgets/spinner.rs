//! Loading screen shown while the store is read and the trend is fit

use std::path::Path;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Braille animation frames
const FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Steps of a dashboard load, in the order the loader reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStage {
    Opening,
    Loading,
    Forecasting,
}

impl LoadingStage {
    pub const COUNT: usize = 3;

    pub fn message(self) -> &'static str {
        match self {
            Self::Opening => "Opening database...",
            Self::Loading => "Loading sales...",
            Self::Forecasting => "Fitting trend...",
        }
    }

    /// 1-based position among the load steps
    pub fn step(self) -> usize {
        match self {
            Self::Opening => 1,
            Self::Loading => 2,
            Self::Forecasting => 3,
        }
    }

    /// Progress line such as `■■□ 2/3`
    pub fn progress(self) -> String {
        let done = self.step();
        let bar: String = (1..=Self::COUNT)
            .map(|i| if i <= done { '■' } else { '□' })
            .collect();
        format!("{} {}/{}", bar, done, Self::COUNT)
    }
}

/// Loading screen: animated stage message, step progress and the store path
pub struct Spinner<'a> {
    frame: usize,
    stage: LoadingStage,
    source: Option<&'a Path>,
}

impl<'a> Spinner<'a> {
    pub fn new(frame: usize, stage: LoadingStage) -> Self {
        Self {
            frame,
            stage,
            source: None,
        }
    }

    /// Show which database is being read
    pub fn source(mut self, path: &'a Path) -> Self {
        self.source = Some(path);
        self
    }

    pub fn current_char(&self) -> char {
        FRAMES[self.frame % FRAMES.len()]
    }

    pub fn next_frame(frame: usize) -> usize {
        (frame + 1) % FRAMES.len()
    }

    fn lines(&self, width: usize) -> Vec<(String, Style)> {
        let mut lines = vec![
            (
                format!("{} {}", self.current_char(), self.stage.message()),
                Style::default().fg(Color::Cyan),
            ),
            (self.stage.progress(), Style::default().fg(Color::Blue)),
        ];
        if let Some(path) = self.source {
            lines.push((
                elide_left(&path.display().to_string(), width),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines
    }
}

/// Keep the tail of `text` within `width` characters, marking the cut with `…`
fn elide_left(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let tail: String = text.chars().skip(len - (width - 1)).collect();
    format!("…{}", tail)
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width < 20 {
            return;
        }

        let lines = self.lines(area.width as usize);
        let height = (lines.len() as u16).min(area.height);
        let top = area.y + area.height.saturating_sub(height) / 2;

        for (row, (text, style)) in lines.iter().take(height as usize).enumerate() {
            let width = text.chars().count() as u16;
            let x = area.x + area.width.saturating_sub(width) / 2;
            buf.set_string(x, top + row as u16, text, *style);
        }
    }
}
