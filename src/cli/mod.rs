//! CLI command handling

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use salescast::config::Config;
use salescast::parsers::{SalesParser, WideCsvParser};
use salescast::services::evaluation::DEFAULT_TEST_RATIO;
use salescast::services::forecaster::DEFAULT_CONFIDENCE;
use salescast::services::{ModelKind, Pipeline, SalesStore};
use salescast::tui::widgets::overview::{format_amount, format_number};
use salescast::tui::widgets::tabs::Tab;
use salescast::tui::TuiConfig;
use salescast::types::{ForecastResult, Granularity, Metric, SalescastError, TimeSeriesPoint};

/// Product sales store with trend forecasting
#[derive(Parser)]
#[command(name = "salescast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file (default: ~/.salescast/sales.db)
    #[arg(long, global = true, env = "SALESCAST_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Which series to build
#[derive(Args, Debug, Clone, PartialEq)]
struct SeriesArgs {
    /// Period width: day, week or month
    #[arg(long, short, default_value = "month")]
    granularity: Granularity,

    /// Value to sum: quantity or revenue
    #[arg(long, short, default_value = "revenue")]
    metric: Metric,

    /// Restrict to one product
    #[arg(long, short)]
    product: Option<i64>,

    /// Insert zero-valued periods where nothing was sold
    #[arg(long)]
    fill_gaps: bool,
}

/// Which model to fit
#[derive(Args, Debug, Clone, PartialEq)]
struct ModelArgs {
    /// Trend model: linear or mean
    #[arg(long, default_value = "linear")]
    model: ModelKind,

    /// Confidence level of the error margin
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Launch interactive TUI (default)
    Tui,

    /// Import a wide-format sales CSV, or every CSV under a directory
    Load {
        path: PathBuf,

        /// Output the import summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a product
    Product {
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a product's price
    SetPrice { id: i64, price: f64 },

    /// Show a product family
    Family {
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a product into a family
    Assign { family_id: i64, product_id: i64 },

    /// Units sold for a product over the last twelve months
    LastYear {
        product_id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the aggregated sales series
    Series {
        #[command(flatten)]
        series: SeriesArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forecast the next periods
    Forecast {
        #[command(flatten)]
        series: SeriesArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Number of periods to forecast
        #[arg(long, default_value_t = 3)]
        horizon: u32,

        /// Forecast every product separately
        #[arg(long, conflicts_with = "product")]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score the model on the most recent periods of the series
    Evaluate {
        #[command(flatten)]
        series: SeriesArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Share of the series held out for testing
        #[arg(long, default_value_t = DEFAULT_TEST_RATIO)]
        test_ratio: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::resolve(self.db)?;

        match self.command {
            None | Some(Commands::Tui) => salescast::tui::run(TuiConfig {
                initial_tab: Tab::Overview,
                db_path: config.db_path,
                pipeline: Pipeline::default(),
            }),
            Some(Commands::Load { path, json }) => run_load(&config, &path, json),
            Some(Commands::Product { id, json }) => run_product(&config, id, json),
            Some(Commands::SetPrice { id, price }) => run_set_price(&config, id, price),
            Some(Commands::Family { id, json }) => run_family(&config, id, json),
            Some(Commands::Assign {
                family_id,
                product_id,
            }) => run_assign(&config, family_id, product_id),
            Some(Commands::LastYear { product_id, json }) => {
                run_last_year(&config, product_id, json)
            }
            Some(Commands::Series { series, json }) => run_series(&config, &series, json),
            Some(Commands::Forecast {
                series,
                model,
                horizon,
                all,
                json,
            }) => {
                let pipeline = pipeline(&series, &model, horizon);
                if all {
                    run_forecast_all(&config, &pipeline, json)
                } else {
                    run_forecast(&config, &pipeline, series.product, json)
                }
            }
            Some(Commands::Evaluate {
                series,
                model,
                test_ratio,
                json,
            }) => {
                let pipeline = pipeline(&series, &model, 1);
                run_evaluate(&config, &pipeline, series.product, test_ratio, json)
            }
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<SalesStore> {
    SalesStore::open(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))
}

fn pipeline(series: &SeriesArgs, model: &ModelArgs, horizon: u32) -> Pipeline {
    Pipeline {
        granularity: series.granularity,
        metric: series.metric,
        horizon,
        model: model.model,
        confidence: model.confidence,
        fill_gaps: series.fill_gaps,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Quantity if value.fract() == 0.0 && value >= 0.0 => format_number(value as u64),
        _ => format_amount(value),
    }
}

/// Import a file or directory
fn run_load(config: &Config, path: &Path, json: bool) -> anyhow::Result<()> {
    let parser = WideCsvParser::new();
    let rows = parser
        .parse_path(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let mut store = open_store(config)?;
    let summary = store.import(&rows)?;

    if json {
        return print_json(&summary);
    }
    println!(
        "Imported {} products ({} skipped), {} families, {} sales",
        summary.products_created,
        summary.products_skipped,
        summary.families_created,
        format_number(summary.sales_inserted as u64)
    );
    Ok(())
}

fn run_product(config: &Config, id: i64, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let product = store.get_product(id)?.ok_or(SalescastError::NotFound {
        entity: "Product",
        id,
    })?;

    if json {
        return print_json(&product);
    }
    println!("Product {}: {}", product.id, product.name);
    println!("  Price:  {}", format_amount(product.price));
    println!("  Family: {}", product.family_id);
    Ok(())
}

fn run_set_price(config: &Config, id: i64, price: f64) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let product = store
        .update_product_price(id, price)?
        .ok_or(SalescastError::NotFound {
            entity: "Product",
            id,
        })?;
    println!(
        "Product {} ({}) now costs {}",
        product.id,
        product.name,
        format_amount(product.price)
    );
    Ok(())
}

fn run_family(config: &Config, id: i64, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let family = store.get_family(id)?.ok_or(SalescastError::NotFound {
        entity: "Family",
        id,
    })?;

    if json {
        return print_json(&family);
    }
    println!("Family {}: {}", family.id, family.name);
    Ok(())
}

fn run_assign(config: &Config, family_id: i64, product_id: i64) -> anyhow::Result<()> {
    let store = open_store(config)?;
    store.assign_product_to_family(family_id, product_id)?;
    println!("Product {} moved to family {}", product_id, family_id);
    Ok(())
}

fn run_last_year(config: &Config, product_id: i64, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let today = Local::now().date_naive();
    let total = store.product_sales_last_year(product_id, today)?;

    if json {
        return print_json(&serde_json::json!({
            "product_id": product_id,
            "total_sales": total,
        }));
    }
    println!(
        "Product {}: {} units sold in the last year",
        product_id,
        format_number(total.max(0) as u64)
    );
    Ok(())
}

fn run_series(config: &Config, args: &SeriesArgs, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let records = store.sale_records(args.product)?;
    let pipeline = Pipeline {
        granularity: args.granularity,
        metric: args.metric,
        fill_gaps: args.fill_gaps,
        ..Pipeline::default()
    };
    let series = pipeline.series(&records)?;

    if json {
        return print_json(&series);
    }
    print_series(args.granularity, args.metric, &series);
    Ok(())
}

fn run_forecast(
    config: &Config,
    pipeline: &Pipeline,
    product: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let records = store.sale_records(product)?;
    let output = pipeline.run(&records)?;

    if json {
        return print_json(&output);
    }
    print_series(pipeline.granularity, pipeline.metric, &output.series);
    println!();
    print_forecast(pipeline, &output.forecast);
    Ok(())
}

fn run_forecast_all(config: &Config, pipeline: &Pipeline, json: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let records = store.sale_records(None)?;
    let results = pipeline.run_per_product(&records)?;

    if json {
        return print_json(&results);
    }
    for result in &results {
        println!("Product {} ({} periods)", result.product_id, result.points);
        match (&result.forecast, &result.error) {
            (Some(forecast), _) => print_forecast(pipeline, forecast),
            (None, Some(error)) => println!("  skipped: {}", error),
            (None, None) => {}
        }
    }
    Ok(())
}

fn run_evaluate(
    config: &Config,
    pipeline: &Pipeline,
    product: Option<i64>,
    test_ratio: f64,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let records = store.sale_records(product)?;
    let series = pipeline.series(&records)?;
    let report = pipeline.evaluate(&series, test_ratio)?;

    if json {
        return print_json(&report);
    }
    println!(
        "{} model, {} train / {} test periods",
        report.model, report.train_points, report.test_points
    );
    println!("  MAE:  {}", format_amount(report.mae));
    println!("  MSE:  {}", format_amount(report.mse));
    println!("  RMSE: {}", format_amount(report.rmse));
    Ok(())
}

fn print_series(granularity: Granularity, metric: Metric, series: &[TimeSeriesPoint]) {
    if series.is_empty() {
        println!("No sales recorded");
        return;
    }
    println!("{:<12} {:>16}", "Period", metric);
    for point in series {
        println!(
            "{:<12} {:>16}",
            granularity.label(point.period_start),
            format_value(metric, point.value)
        );
    }
}

fn print_forecast(pipeline: &Pipeline, forecast: &[ForecastResult]) {
    println!(
        "{:<12} {:>16} {:>14}  ({:.0}% interval)",
        "Forecast",
        pipeline.metric,
        "margin",
        pipeline.confidence * 100.0
    );
    for result in forecast {
        println!(
            "{:<12} {:>16} {:>14}  [{} .. {}]",
            pipeline.granularity.label(result.period),
            format_amount(result.predicted_value),
            format!("± {}", format_amount(result.error_margin)),
            format_amount(result.lower()),
            format_amount(result.upper())
        );
    }
}
