//! Monthly time series with a checked constructor, plus the calendar helpers
//! used to build and extend them.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::error::{ForecastError, Result};

/// One (timestamp, value) pair. Timestamps are the first day of a month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Normalize a date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    // day 1 exists in every month
    date.with_day(1).unwrap_or(date)
}

/// `date + n` months.
pub fn add_months(date: NaiveDate, n: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(n)).ok_or_else(|| {
        ForecastError::InvalidSeries(format!("{} + {} months is out of range", date, n))
    })
}

/// `count` consecutive month starts beginning at the month of `start`.
pub fn month_sequence(start: NaiveDate, count: usize) -> Result<Vec<NaiveDate>> {
    let start = first_of_month(start);
    (0..count)
        .map(|i| {
            let i = u32::try_from(i)
                .map_err(|_| ForecastError::InvalidConfig(format!("too many periods: {}", count)))?;
            add_months(start, i)
        })
        .collect()
}

/// Number of months from the month of `start` to the month of `end`,
/// inclusive of both. `None` when `end` precedes `start`.
pub fn months_between_inclusive(start: NaiveDate, end: NaiveDate) -> Option<usize> {
    let months = |d: NaiveDate| d.year() as i64 * 12 + d.month0() as i64;
    let diff = months(end) - months(start);
    usize::try_from(diff).ok().map(|d| d + 1)
}

/// Month starts from `start` to `end`, both inclusive.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    let count = months_between_inclusive(start, end).ok_or_else(|| {
        ForecastError::InvalidConfig(format!("end date {} precedes start date {}", end, start))
    })?;
    month_sequence(start, count)
}

/// Ordered monthly series: strictly increasing first-of-month timestamps,
/// one month apart, finite values. May be empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        for (i, obs) in observations.iter().enumerate() {
            if obs.date.day() != 1 {
                return Err(ForecastError::InvalidSeries(format!(
                    "timestamp {} at position {} is not the first of a month",
                    obs.date, i
                )));
            }
            if !obs.value.is_finite() {
                return Err(ForecastError::InvalidSeries(format!(
                    "value at {} is not finite",
                    obs.date
                )));
            }
        }
        for pair in observations.windows(2) {
            let expected = add_months(pair[0].date, 1)?;
            if pair[1].date != expected {
                return Err(ForecastError::InvalidSeries(format!(
                    "timestamp {} does not follow {} by one month",
                    pair[1].date, pair[0].date
                )));
            }
        }
        Ok(Self { observations })
    }

    /// Series of `values` starting at the month of `start`.
    pub fn from_values(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let dates = month_sequence(start, values.len())?;
        Self::new(
            dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Timestamp one month after the last observation.
    pub fn next_date(&self) -> Option<Result<NaiveDate>> {
        self.last_date().map(|d| add_months(d, 1))
    }
}

/// Historical and forecast observations joined for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedSeries {
    observations: Vec<Observation>,
    boundary: NaiveDate,
    historical_len: usize,
}

impl CombinedSeries {
    /// Concatenate `historical` and `forecast`; the forecast must start one
    /// month after the historical series ends.
    pub fn concat(historical: &TimeSeries, forecast: &TimeSeries) -> Result<Self> {
        let boundary = historical
            .last_date()
            .ok_or(ForecastError::EmptySeries("historical"))?;
        let forecast_start = forecast
            .first_date()
            .ok_or(ForecastError::EmptySeries("forecast"))?;

        if forecast_start != add_months(boundary, 1)? {
            return Err(ForecastError::InvalidSeries(format!(
                "forecast starts at {} but history ends at {}",
                forecast_start, boundary
            )));
        }

        let mut observations = Vec::with_capacity(historical.len() + forecast.len());
        observations.extend_from_slice(historical.observations());
        observations.extend_from_slice(forecast.observations());

        Ok(Self {
            observations,
            boundary,
            historical_len: historical.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Last historical timestamp.
    pub fn boundary(&self) -> NaiveDate {
        self.boundary
    }

    pub fn historical(&self) -> &[Observation] {
        &self.observations[..self.historical_len]
    }

    pub fn forecast(&self) -> &[Observation] {
        &self.observations[self.historical_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_range_three_years() {
        let dates = month_range(ymd(2021, 1, 1), ymd(2023, 12, 1)).unwrap();
        assert_eq!(dates.len(), 36);
        assert_eq!(dates[0], ymd(2021, 1, 1));
        assert_eq!(dates[35], ymd(2023, 12, 1));
    }

    #[test]
    fn test_month_range_normalizes_days() {
        let dates = month_range(ymd(2021, 1, 15), ymd(2021, 3, 31)).unwrap();
        assert_eq!(dates, vec![ymd(2021, 1, 1), ymd(2021, 2, 1), ymd(2021, 3, 1)]);
    }

    #[test]
    fn test_month_range_rejects_reversed() {
        let err = month_range(ymd(2022, 1, 1), ymd(2021, 1, 1)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidConfig(_)));
    }

    #[test]
    fn test_add_months_crosses_year() {
        assert_eq!(add_months(ymd(2023, 12, 1), 1).unwrap(), ymd(2024, 1, 1));
        assert_eq!(add_months(ymd(2024, 1, 1), 23).unwrap(), ymd(2025, 12, 1));
    }

    #[test]
    fn test_new_rejects_gap() {
        let obs = vec![
            Observation::new(ymd(2021, 1, 1), 1.0),
            Observation::new(ymd(2021, 3, 1), 2.0),
        ];
        assert!(matches!(TimeSeries::new(obs), Err(ForecastError::InvalidSeries(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_and_mid_month() {
        let dup = vec![
            Observation::new(ymd(2021, 1, 1), 1.0),
            Observation::new(ymd(2021, 1, 1), 2.0),
        ];
        assert!(TimeSeries::new(dup).is_err());
        assert!(TimeSeries::new(vec![Observation::new(ymd(2021, 1, 2), 1.0)]).is_err());
    }

    #[test]
    fn test_new_rejects_nan() {
        let obs = vec![Observation::new(ymd(2021, 1, 1), f64::NAN)];
        assert!(TimeSeries::new(obs).is_err());
    }

    #[test]
    fn test_empty_series_allowed() {
        let ts = TimeSeries::new(vec![]).unwrap();
        assert!(ts.is_empty());
        assert!(ts.last_date().is_none());
        assert!(ts.next_date().is_none());
    }

    #[test]
    fn test_concat_sets_boundary() {
        let hist = TimeSeries::from_values(ymd(2021, 1, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let fc = TimeSeries::from_values(ymd(2021, 4, 1), vec![4.0, 5.0]).unwrap();
        let combined = CombinedSeries::concat(&hist, &fc).unwrap();
        assert_eq!(combined.len(), 5);
        assert_eq!(combined.boundary(), ymd(2021, 3, 1));
        assert_eq!(combined.historical().len(), 3);
        assert_eq!(combined.forecast()[0].value, 4.0);
    }

    #[test]
    fn test_concat_rejects_misaligned_forecast() {
        let hist = TimeSeries::from_values(ymd(2021, 1, 1), vec![1.0, 2.0]).unwrap();
        let fc = TimeSeries::from_values(ymd(2021, 5, 1), vec![4.0]).unwrap();
        assert!(matches!(
            CombinedSeries::concat(&hist, &fc),
            Err(ForecastError::InvalidSeries(_))
        ));
    }

    #[test]
    fn test_concat_rejects_empty() {
        let hist = TimeSeries::from_values(ymd(2021, 1, 1), vec![1.0]).unwrap();
        let err = CombinedSeries::concat(&TimeSeries::empty(), &hist).unwrap_err();
        assert!(matches!(err, ForecastError::EmptySeries("historical")));
        let err = CombinedSeries::concat(&hist, &TimeSeries::empty()).unwrap_err();
        assert!(matches!(err, ForecastError::EmptySeries("forecast")));
    }
}
