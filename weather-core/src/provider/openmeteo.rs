use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{Error, Result},
    http::CachedClient,
    model::Coordinates,
};

use super::{ForecastProvider, HourlySeries};

/// Open-Meteo forecast API (no authentication).
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Arc<CachedClient>,
}

impl OpenMeteoProvider {
    pub fn new(base_url: impl Into<String>, http: Arc<CachedClient>) -> Self {
        Self { base_url: base_url.into(), http }
    }
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    temperature_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    hourly: OmHourly,
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn hourly_temperature(
        &self,
        coordinates: Coordinates,
        timezone: &str,
    ) -> Result<HourlySeries> {
        let url = format!("{}/v1/forecast", self.base_url.trim_end_matches('/'));

        let body = self
            .http
            .get_text(
                &url,
                &[
                    ("latitude", coordinates.latitude.to_string()),
                    ("longitude", coordinates.longitude.to_string()),
                    ("hourly", "temperature_2m".into()),
                    ("timezone", timezone.to_string()),
                    ("timeformat", "unixtime".into()),
                ],
                HeaderMap::new(),
            )
            .await?;

        let parsed: OmForecastResponse = serde_json::from_str(&body)?;

        if parsed.hourly.time.len() != parsed.hourly.temperature_2m.len() {
            return Err(Error::Forecast(format!(
                "hourly response has {} timestamps but {} temperatures",
                parsed.hourly.time.len(),
                parsed.hourly.temperature_2m.len()
            )));
        }

        HourlySeries::from_timestamps(&parsed.hourly.time, parsed.hourly.temperature_2m)
    }
}
