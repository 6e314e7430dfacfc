//! Synthetic monthly accident counts, a seasonal ARIMA fit in state-space
//! form, a 24-month forecast and an SVG chart of the result.

pub mod error;
pub mod types;
pub mod params;
pub mod polynomial;
pub mod state_space;
pub mod initialization;
pub mod kalman;
pub mod start_params;
pub mod optimizer;
pub mod forecast;

pub mod series;
pub mod generator;
pub mod model;
pub mod config;
pub mod chart;
pub mod pipeline;

pub use config::{ChartConfig, PipelineConfig};
pub use error::{ForecastError, Result};
pub use generator::SeriesGenerator;
pub use model::{FittedModel, Forecast, ModelSummary, SarimaModel};
pub use pipeline::{run, PipelineOutput};
pub use series::{CombinedSeries, Observation, TimeSeries};
pub use types::{Method, ModelConfig, SarimaOrder};
