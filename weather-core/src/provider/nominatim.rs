use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{Error, Result},
    http::CachedClient,
    model::Coordinates,
};

use super::Geocoder;

/// OpenStreetMap Nominatim search API.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    user_agent: String,
    http: Arc<CachedClient>,
}

impl NominatimGeocoder {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        http: Arc<CachedClient>,
    ) -> Self {
        Self { base_url: base_url.into(), user_agent: user_agent.into(), http }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| Error::Config(format!("Invalid geocoding user agent: {e}")))?;
        headers.insert(USER_AGENT, value);
        Ok(headers)
    }
}

#[derive(Debug, Deserialize)]
struct NmPlace {
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));

        let body = self
            .http
            .get_text(
                &url,
                &[("q", query.to_string()), ("format", "json".into()), ("limit", "1".into())],
                self.headers()?,
            )
            .await?;

        let places: Vec<NmPlace> = serde_json::from_str(&body)?;

        let Some(place) = places.first() else {
            return Ok(None);
        };

        let latitude = place
            .lat
            .parse::<f64>()
            .map_err(|e| Error::Geocoding(format!("invalid latitude '{}': {e}", place.lat)))?;
        let longitude = place
            .lon
            .parse::<f64>()
            .map_err(|e| Error::Geocoding(format!("invalid longitude '{}': {e}", place.lon)))?;

        Ok(Some(Coordinates::new(latitude, longitude)))
    }
}
