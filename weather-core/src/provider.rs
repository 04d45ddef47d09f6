use async_trait::async_trait;
use chrono::DateTime;
use std::fmt::Debug;

use crate::{
    error::{Error, Result},
    model::{Coordinates, HourlyTemperature},
};

pub mod nominatim;
pub mod openmeteo;
pub mod tzindex;

pub use nominatim::NominatimGeocoder;
pub use openmeteo::OpenMeteoProvider;
pub use tzindex::TzfIndex;

/// Turns a free-form place query into coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` when the provider knows no such place.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>>;
}

/// Offline point-in-polygon lookup of IANA timezones.
pub trait TimezoneIndex: Send + Sync + Debug {
    /// `Ok(None)` when no zone covers the point.
    fn zone_at(&self, coordinates: Coordinates) -> Result<Option<String>>;
}

/// Source of hourly forecasts.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn hourly_temperature(
        &self,
        coordinates: Coordinates,
        timezone: &str,
    ) -> Result<HourlySeries>;
}

/// An evenly spaced time series as reported by a provider.
///
/// Covers `[start, end)` in steps of `interval` seconds, one value per step.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    /// Unix seconds of the first point.
    pub start: i64,
    /// Unix seconds one interval past the last point.
    pub end: i64,
    pub interval: i64,
    pub values: Vec<Option<f64>>,
}

impl HourlySeries {
    /// Build a series from explicit timestamps, deriving the interval from the
    /// first two points (one hour for a single point).
    pub fn from_timestamps(times: &[i64], values: Vec<Option<f64>>) -> Result<Self> {
        let start = *times
            .first()
            .ok_or_else(|| Error::Forecast("forecast response contained no hourly data".into()))?;

        let overflow = || Error::Forecast("hourly timestamps out of range".into());

        let interval = match times.get(1) {
            Some(second) => second.checked_sub(start).ok_or_else(overflow)?,
            None => 3600,
        };
        if interval <= 0 {
            return Err(Error::Forecast(format!("invalid hourly interval of {interval} seconds")));
        }

        let end = i64::try_from(times.len())
            .ok()
            .and_then(|len| interval.checked_mul(len))
            .and_then(|span| start.checked_add(span))
            .ok_or_else(overflow)?;
        Ok(Self { start, end, interval, values })
    }

    /// Expand to one record per step over `[start, end)`.
    pub fn records(&self) -> Result<Vec<HourlyTemperature>> {
        if self.interval <= 0 {
            return Err(Error::Forecast(format!(
                "invalid hourly interval of {} seconds",
                self.interval
            )));
        }

        let timestamps: Vec<i64> =
            (self.start..self.end).step_by(self.interval as usize).collect();

        if timestamps.len() != self.values.len() {
            return Err(Error::Forecast(format!(
                "expected {} hourly values, got {}",
                timestamps.len(),
                self.values.len()
            )));
        }

        timestamps
            .into_iter()
            .zip(self.values.iter().copied())
            .map(|(ts, temperature_2m)| {
                let date = DateTime::from_timestamp(ts, 0)
                    .ok_or_else(|| Error::Forecast(format!("timestamp {ts} out of range")))?;
                Ok(HourlyTemperature { date, temperature_2m })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_cover_half_open_range() {
        let series = HourlySeries {
            start: 1_720_396_800,
            end: 1_720_396_800 + 3 * 3600,
            interval: 3600,
            values: vec![Some(14.0), None, Some(15.5)],
        };

        let records = series.records().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date.timestamp(), 1_720_396_800);
        assert_eq!(records[2].date.timestamp(), 1_720_396_800 + 2 * 3600);
        assert_eq!(records[1].temperature_2m, None);
        assert_eq!(records[2].temperature_2m, Some(15.5));
    }

    #[test]
    fn value_count_mismatch_is_an_error() {
        let series =
            HourlySeries { start: 0, end: 7200, interval: 3600, values: vec![Some(1.0)] };

        let err = series.records().unwrap_err();
        assert!(err.to_string().contains("expected 2 hourly values, got 1"));
    }

    #[test]
    fn interval_is_derived_from_first_two_points() {
        let series =
            HourlySeries::from_timestamps(&[100, 1000, 1900], vec![None, None, None]).unwrap();

        assert_eq!(series.interval, 900);
        assert_eq!(series.end, 100 + 3 * 900);
    }

    #[test]
    fn single_point_defaults_to_one_hour() {
        let series = HourlySeries::from_timestamps(&[100], vec![Some(3.0)]).unwrap();

        assert_eq!(series.interval, 3600);
        assert_eq!(series.records().unwrap().len(), 1);
    }

    #[test]
    fn empty_or_unordered_timestamps_are_rejected() {
        assert!(HourlySeries::from_timestamps(&[], vec![]).is_err());
        assert!(HourlySeries::from_timestamps(&[200, 100], vec![None, None]).is_err());
    }

    #[test]
    fn overflowing_timestamps_are_rejected() {
        let times = [0, 4_611_686_018_427_387_904, i64::MAX];

        let err = HourlySeries::from_timestamps(&times, vec![Some(1.0), Some(2.0), Some(3.0)])
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let err = HourlySeries::from_timestamps(&[i64::MIN, i64::MAX], vec![None, None])
            .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
