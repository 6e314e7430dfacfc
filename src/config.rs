use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::generator::SeriesGenerator;
use crate::types::{Method, ModelConfig, SarimaOrder};

/// Chart labels and canvas size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Traffic Accident Forecast (SARIMA)".into(),
            x_label: "Date".into(),
            y_label: "Accidents".into(),
            width: 1400,
            height: 700,
        }
    }
}

/// Everything the pipeline needs. Every field has a default, so a partial
/// JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub seed: u64,
    /// (p, d, q)
    pub order: [usize; 3],
    /// (P, D, Q, s)
    pub seasonal_order: [usize; 4],
    pub horizon: usize,
    pub relax_stability_checks: bool,
    pub method: Method,
    pub max_iter: u64,
    /// Significance level of the forecast interval.
    pub alpha: f64,
    pub generator: SeriesGenerator,
    pub chart: ChartConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap_or_default(),
            seed: 42,
            order: [1, 1, 1],
            seasonal_order: [1, 1, 1, 12],
            horizon: 24,
            relax_stability_checks: true,
            method: Method::Lbfgsb,
            max_iter: 500,
            alpha: 0.05,
            generator: SeriesGenerator::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn sarima_order(&self) -> SarimaOrder {
        let [p, d, q] = self.order;
        let [pp, dd, qq, s] = self.seasonal_order;
        SarimaOrder::from_tuples((p, d, q), (pp, dd, qq, s))
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            order: self.sarima_order(),
            relax_stability_checks: self.relax_stability_checks,
            method: self.method,
            max_iter: self.max_iter,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon < 1 {
            return Err(ForecastError::InvalidHorizon(self.horizon));
        }
        if self.end_date < self.start_date {
            return Err(ForecastError::InvalidConfig(format!(
                "end_date {} precedes start_date {}",
                self.end_date, self.start_date
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.max_iter == 0 {
            return Err(ForecastError::InvalidConfig("max_iter must be positive".into()));
        }

        let order = self.sarima_order();
        order.validate()?;
        if order.has_seasonal_terms() && order.s != self.generator.seasonal_period {
            return Err(ForecastError::InvalidConfig(format!(
                "seasonal period {} does not match the generated cycle length {}",
                order.s, self.generator.seasonal_period
            )));
        }
        self.generator.validate()?;

        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ForecastError::InvalidConfig("chart size must be non-zero".into()));
        }
        Ok(())
    }
}
