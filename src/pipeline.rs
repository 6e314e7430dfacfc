//! generate -> fit -> forecast -> plot, executed once.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::chart;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::{FittedModel, Forecast, SarimaModel};
use crate::series::{CombinedSeries, TimeSeries};

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub historical: TimeSeries,
    pub model: FittedModel,
    pub forecast: Forecast,
    pub combined: CombinedSeries,
    pub svg: String,
}

/// Run all four stages. Any error aborts the run and nothing is rendered.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let historical = config
        .generator
        .generate_range(config.start_date, config.end_date, &mut rng)?;
    info!(
        points = historical.len(),
        seed = config.seed,
        "generated historical series"
    );

    let model_config = config.model_config();
    let model = SarimaModel::new(model_config).fit(&historical)?;
    info!(
        order = %model.order(),
        method = %model.fit_result().method,
        aic = model.aic(),
        "fitted model"
    );

    let forecast = model.forecast(config.horizon, config.alpha)?;
    info!(
        horizon = forecast.len(),
        first = ?forecast.mean.first_date(),
        last = ?forecast.mean.last_date(),
        "forecast complete"
    );

    let (combined, svg) = chart::render_svg(&historical, &forecast.mean, &config.chart)?;
    info!(points = combined.len(), bytes = svg.len(), "chart rendered");

    Ok(PipelineOutput {
        historical,
        model,
        forecast,
        combined,
        svg,
    })
}
