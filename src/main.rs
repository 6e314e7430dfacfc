//! # accident-forecast
//!
//! Generates the synthetic accident series, fits SARIMA, forecasts and
//! writes the chart.

use std::path::PathBuf;

use accident_forecast::{chart, pipeline, Method, PipelineConfig};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "accident-forecast")]
#[command(about = "Seasonal ARIMA forecast of monthly traffic accidents", long_about = None)]
struct Cli {
    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the SVG chart
    #[arg(short, long, default_value = "forecast.svg")]
    output: PathBuf,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of months to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// Override the optimizer (lbfgsb, lbfgs, nelder-mead)
    #[arg(short, long)]
    method: Option<Method>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accident_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(horizon) = cli.horizon {
        config.horizon = horizon;
    }
    if let Some(method) = cli.method {
        config.method = method;
    }

    let output = pipeline::run(&config)?;
    chart::save(&output.svg, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    let summary = output.model.summary();
    println!("Model:      {}", summary.order);
    println!("AR:         {:?}", summary.ar);
    println!("MA:         {:?}", summary.ma);
    println!("SAR:        {:?}", summary.seasonal_ar);
    println!("SMA:        {:?}", summary.seasonal_ma);
    println!("sigma2:     {:.4}", summary.sigma2);
    println!("AIC:        {:.4}", summary.aic);
    println!("Optimizer:  {} ({} iterations)", summary.method, summary.iterations);

    let points = output.forecast.mean.observations();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        println!("Forecast:   {} = {:.2} .. {} = {:.2}", first.date, first.value, last.date, last.value);
    }
    println!("Chart:      {}", cli.output.display());

    Ok(())
}
