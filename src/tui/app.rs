//! Application state and event loop

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Widget,
    DefaultTerminal, Frame,
};

use crate::services::{Aggregator, Pipeline, SalesStore};
use crate::types::{ForecastResult, Metric, Result, TimeSeriesPoint};

use super::widgets::{
    forecast::ForecastTable,
    overview::{Overview, SalesTotals},
    spinner::{LoadingStage, Spinner},
    tabs::{Tab, TabBar},
};

/// TUI startup options
#[derive(Debug, Clone)]
pub struct TuiConfig {
    pub initial_tab: Tab,
    pub db_path: PathBuf,
    pub pipeline: Pipeline,
}

/// Application state
pub enum AppState {
    /// Loading data with spinner animation
    Loading {
        spinner_frame: usize,
        stage: LoadingStage,
    },
    /// Ready with loaded data
    Ready { data: Box<AppData> },
    /// Error state
    Error { message: String },
}

/// Loaded application data
pub struct AppData {
    pub totals: SalesTotals,
    pub series: Vec<TimeSeriesPoint>,
    /// Forecast, or why it could not be made
    pub forecast: std::result::Result<Vec<ForecastResult>, String>,
}

/// Progress reported by the loader thread
pub enum LoadEvent {
    Stage(LoadingStage),
    Done(std::result::Result<AppData, String>),
}

/// Main application
pub struct App {
    state: AppState,
    tab: Tab,
    config: TuiConfig,
    loader: Option<Receiver<LoadEvent>>,
    should_quit: bool,
}

impl App {
    /// Create a new app in loading state
    pub fn new(config: TuiConfig) -> Self {
        Self {
            state: AppState::Loading {
                spinner_frame: 0,
                stage: LoadingStage::Opening,
            },
            tab: config.initial_tab,
            config,
            loader: None,
            should_quit: false,
        }
    }

    /// Read the store and fit the trend on a background thread. The event
    /// loop keeps drawing while [`App::poll_loader`] picks up progress.
    pub fn start_loading(&mut self) {
        let (tx, rx) = mpsc::channel();
        let config = self.config.clone();

        thread::spawn(move || {
            let result = load_app_data(&config, |stage| {
                // The app may already have quit; nothing to report to then
                let _ = tx.send(LoadEvent::Stage(stage));
            })
            .map_err(|e| e.to_string());
            let _ = tx.send(LoadEvent::Done(result));
        });

        self.loader = Some(rx);
    }

    /// Apply every event the loader has sent so far
    pub fn poll_loader(&mut self) {
        let Some(rx) = self.loader.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(LoadEvent::Stage(stage)) => {
                    if let AppState::Loading { spinner_frame, .. } = self.state {
                        self.state = AppState::Loading {
                            spinner_frame,
                            stage,
                        };
                    }
                }
                Ok(LoadEvent::Done(result)) => {
                    self.finish_loading(result);
                    break;
                }
                Err(TryRecvError::Empty) => {
                    self.loader = Some(rx);
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    self.finish_loading(Err("loader stopped before finishing".to_string()));
                    break;
                }
            }
        }
    }

    fn finish_loading(&mut self, result: std::result::Result<AppData, String>) {
        self.state = match result {
            Ok(data) => AppState::Ready {
                data: Box::new(data),
            },
            Err(message) => {
                log::error!("dashboard load failed: {}", message);
                AppState::Error {
                    message: format!("Failed to load sales: {}", message),
                }
            }
        };
    }

    /// Handle keyboard events
    pub fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                        self.should_quit = true;
                    }
                    KeyCode::Tab | KeyCode::Right => self.tab = self.tab.next(),
                    KeyCode::BackTab | KeyCode::Left => self.tab = self.tab.prev(),
                    KeyCode::Char(c) => {
                        if let Some(tab) = Tab::from_shortcut(c) {
                            self.tab = tab;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Update spinner animation
    pub fn tick(&mut self) {
        if let AppState::Loading {
            spinner_frame,
            stage,
        } = &self.state
        {
            self.state = AppState::Loading {
                spinner_frame: Spinner::next_frame(*spinner_frame),
                stage: *stage,
            };
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Draw the application
    pub fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn render_ready(&self, data: &AppData, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::vertical([
            Constraint::Length(2), // Tab bar
            Constraint::Min(0),    // Content
        ])
        .split(area);

        TabBar::new(self.tab).render(chunks[0], buf);

        let pipeline = &self.config.pipeline;
        let forecast = data.forecast.as_deref().map_err(String::as_str);
        match self.tab {
            Tab::Overview => Overview::new(
                &data.totals,
                &data.series,
                forecast,
                pipeline.granularity,
                pipeline.metric,
            )
            .render(chunks[1], buf),
            Tab::Forecast => ForecastTable::new(
                forecast,
                pipeline.granularity,
                pipeline.metric,
                pipeline.confidence,
            )
            .render(chunks[1], buf),
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match &self.state {
            AppState::Loading {
                spinner_frame,
                stage,
            } => {
                Spinner::new(*spinner_frame, *stage)
                    .source(&self.config.db_path)
                    .render(area, buf);
            }
            AppState::Ready { data } => self.render_ready(data, area, buf),
            AppState::Error { message } => {
                let y = area.y + area.height / 2;
                let text = format!("Error: {}", message);
                let x = area.x + (area.width.saturating_sub(text.len() as u16)) / 2;
                buf.set_string(x, y, &text, Style::default().fg(Color::Red));
            }
        }
    }
}

/// Run the TUI application
pub fn run(config: TuiConfig) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, config);
    ratatui::restore();
    result
}

fn run_app(terminal: &mut DefaultTerminal, config: TuiConfig) -> anyhow::Result<()> {
    let mut app = App::new(config);
    app.start_loading();

    loop {
        app.poll_loader();
        terminal.draw(|frame| app.draw(frame))?;

        if app.should_quit() {
            break;
        }

        // Poll for events with 100ms timeout for spinner animation
        if event::poll(Duration::from_millis(100))? {
            app.handle_event(event::read()?);
        } else {
            app.tick();
        }
    }

    Ok(())
}

/// Open the store, total the sales and forecast the configured series,
/// reporting each stage as it starts
fn load_app_data(config: &TuiConfig, progress: impl Fn(LoadingStage)) -> Result<AppData> {
    progress(LoadingStage::Opening);
    let store = SalesStore::open(&config.db_path)?;

    progress(LoadingStage::Loading);
    let records = store.sale_records(None)?;
    let totals = SalesTotals {
        revenue: Aggregator::total(&records, Metric::Revenue),
        units: Aggregator::total(&records, Metric::Quantity) as u64,
        products: store.product_ids()?.len(),
        sales: records.len(),
    };

    progress(LoadingStage::Forecasting);
    let pipeline = config.pipeline;
    let series = pipeline.series(&records)?;
    let forecast = pipeline.forecast(&series).map_err(|e| {
        log::warn!("dashboard forecast unavailable: {}", e);
        e.to_string()
    });

    Ok(AppData {
        totals,
        series,
        forecast,
    })
}
