use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("optimizer ({method}) did not converge after {iterations} iterations")]
    FitConvergence { method: String, iterations: u64 },

    #[error("forecast horizon must be at least 1, got {0}")]
    InvalidHorizon(usize),

    #[error("{0} series is empty")]
    EmptySeries(&'static str),

    #[error("invalid time series: {0}")]
    InvalidSeries(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parameter length mismatch: expected {expected}, got {got}")]
    ParamLengthMismatch { expected: usize, got: usize },

    #[error("state space construction failed: {0}")]
    StateSpace(String),

    #[error("optimization failed: {0}")]
    Optimization(String),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ForecastError::InsufficientData { needed: 28, got: 3 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 28 observations, got 3"
        );
        assert_eq!(
            ForecastError::InvalidHorizon(0).to_string(),
            "forecast horizon must be at least 1, got 0"
        );
        assert_eq!(
            ForecastError::EmptySeries("historical").to_string(),
            "historical series is empty"
        );
    }
}
