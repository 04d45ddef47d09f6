//! The three lookups exposed to the agent as tools.
//!
//! Each resolver catches its own failures and reports them as
//! [`ToolResult::Error`]; nothing here returns `Err` or panics.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use tracing::{error, info};

use crate::{
    model::{Coordinates, CoordinatesReport, ForecastReport, TimezoneInfo, ToolResult},
    provider::{ForecastProvider, Geocoder, TimezoneIndex},
};

/// City (and optional country) → coordinates.
#[derive(Debug, Clone)]
pub struct CoordinateResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl CoordinateResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    pub async fn resolve(&self, city: &str, country: &str) -> ToolResult<CoordinatesReport> {
        info!(city, country, "Tool: get_coordinates called");

        let query = geocoding_query(city, country);

        match self.geocoder.geocode(&query).await {
            Ok(Some(coordinates)) => ToolResult::Success(CoordinatesReport { coordinates }),
            Ok(None) => ToolResult::error(format!("Could not find coordinates for '{query}'.")),
            Err(e) => {
                error!(%query, "Geocoding error: {e}");
                ToolResult::error(format!("An error occurred: {e}"))
            }
        }
    }
}

/// `"{City}, {Country}"`, or just `"{City}"` without a country.
pub fn geocoding_query(city: &str, country: &str) -> String {
    let city = title_case(city.trim());
    let country = title_case(country.trim());

    if country.is_empty() { city } else { format!("{city}, {country}") }
}

/// Upper-case the first letter of every word, lower-case the rest.
/// A word starts at any letter not preceded by another letter.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_alpha = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }

    out
}

/// Coordinates → IANA zone and current local time.
#[derive(Debug, Clone)]
pub struct TimezoneResolver {
    index: Arc<dyn TimezoneIndex>,
    clock: fn() -> DateTime<Utc>,
}

impl TimezoneResolver {
    pub fn new(index: Arc<dyn TimezoneIndex>) -> Self {
        Self { index, clock: Utc::now }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolve(&self, latitude: f64, longitude: f64) -> ToolResult<TimezoneInfo> {
        info!(latitude, longitude, "Tool: get_local_time_info called");

        let coordinates = Coordinates::new(latitude, longitude);
        if !coordinates.is_valid() {
            return ToolResult::error("Could not determine timezone for the coordinates.");
        }

        let zone = match self.index.zone_at(coordinates) {
            Ok(Some(zone)) => zone,
            Ok(None) => {
                return ToolResult::error("Could not determine timezone for the coordinates.");
            }
            Err(e) => {
                error!("Timezone resolution error: {e}");
                return ToolResult::error(format!("Failed to determine timezone or time: {e}"));
            }
        };

        let tz: Tz = match zone.parse() {
            Ok(tz) => tz,
            Err(e) => {
                error!(%zone, "Timezone resolution error: {e}");
                return ToolResult::error(format!("Failed to determine timezone or time: {e}"));
            }
        };

        let local_time =
            (self.clock)().with_timezone(&tz).to_rfc3339_opts(SecondsFormat::Secs, false);

        ToolResult::Success(TimezoneInfo { timezone: zone, local_time })
    }
}

/// Coordinates + zone → hourly temperature table.
#[derive(Debug, Clone)]
pub struct ForecastFetcher {
    provider: Arc<dyn ForecastProvider>,
}

impl ForecastFetcher {
    pub fn new(provider: Arc<dyn ForecastProvider>) -> Self {
        Self { provider }
    }

    pub async fn resolve(
        &self,
        latitude: f64,
        longitude: f64,
        timezone: &str,
    ) -> ToolResult<ForecastReport> {
        info!(latitude, longitude, timezone, "Tool: get_weather_forecast called");

        let coordinates = Coordinates::new(latitude, longitude);

        let report = self
            .provider
            .hourly_temperature(coordinates, timezone)
            .await
            .and_then(|series| series.records());

        match report {
            Ok(report) => ToolResult::Success(ForecastReport { coordinates, report }),
            Err(e) => {
                error!("Weather API error: {e}");
                ToolResult::error(format!("Failed to retrieve weather data: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::http::{CachedClient, RetryPolicy};
    use crate::provider::{HourlySeries, OpenMeteoProvider};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct StubGeocoder {
        answer: Option<Coordinates>,
        fail: bool,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, query: &str) -> Result<Option<Coordinates>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(Error::Geocoding("service unavailable".into()));
            }
            Ok(self.answer)
        }
    }

    #[derive(Debug)]
    struct StubIndex(Option<&'static str>);

    impl TimezoneIndex for StubIndex {
        fn zone_at(&self, _coordinates: Coordinates) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    #[derive(Debug)]
    struct StubForecast(HourlySeries);

    #[async_trait]
    impl ForecastProvider for StubForecast {
        async fn hourly_temperature(&self, _: Coordinates, _: &str) -> Result<HourlySeries> {
            Ok(self.0.clone())
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 8, 18, 52, 0).unwrap()
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("LONDON"), "London");
        assert_eq!(title_case("saint-étienne"), "Saint-Étienne");
        assert_eq!(title_case("o'brien"), "O'Brien");
    }

    #[test]
    fn query_omits_empty_country() {
        assert_eq!(geocoding_query("  paris ", "   "), "Paris");
        assert_eq!(geocoding_query(" london ", "uk"), "London, Uk");
    }

    #[tokio::test]
    async fn coordinates_are_independent_of_casing_and_whitespace() {
        let geocoder = Arc::new(StubGeocoder {
            answer: Some(Coordinates::new(51.5, -0.12)),
            ..Default::default()
        });
        let resolver = CoordinateResolver::new(geocoder.clone());

        for city in [" london ", "London", "LONDON"] {
            let result = resolver.resolve(city, "").await;
            assert_eq!(
                result,
                ToolResult::Success(CoordinatesReport {
                    coordinates: Coordinates::new(51.5, -0.12)
                })
            );
        }

        assert_eq!(*geocoder.queries.lock().unwrap(), vec!["London"; 3]);
    }

    #[tokio::test]
    async fn unknown_city_names_the_query() {
        let resolver = CoordinateResolver::new(Arc::new(StubGeocoder::default()));

        let result = resolver.resolve("atlantis", "ocean").await;

        assert_eq!(
            result.error_message(),
            Some("Could not find coordinates for 'Atlantis, Ocean'.")
        );
    }

    #[tokio::test]
    async fn geocoder_failure_becomes_error_result() {
        let resolver =
            CoordinateResolver::new(Arc::new(StubGeocoder { fail: true, ..Default::default() }));

        let result = resolver.resolve("Berlin", "").await;

        assert_eq!(
            result.error_message(),
            Some("An error occurred: Geocoding error: service unavailable")
        );
    }

    #[test]
    fn local_time_is_rendered_in_zone_with_seconds() {
        let resolver = TimezoneResolver::new(Arc::new(StubIndex(Some("America/Santiago"))))
            .with_clock(fixed_now);

        let result = resolver.resolve(-33.45, -70.66);

        assert_eq!(
            result,
            ToolResult::Success(TimezoneInfo {
                timezone: "America/Santiago".into(),
                local_time: "2025-07-08T14:52:00-04:00".into(),
            })
        );
    }

    #[test]
    fn uncovered_or_invalid_points_are_errors() {
        let resolver = TimezoneResolver::new(Arc::new(StubIndex(None)));
        for (lat, lon) in [(0.0, -140.0), (95.0, 0.0), (0.0, 181.0), (f64::NAN, 0.0)] {
            let result = resolver.resolve(lat, lon);
            assert_eq!(
                result.error_message(),
                Some("Could not determine timezone for the coordinates.")
            );
        }
    }

    #[test]
    fn unknown_zone_name_is_an_error_result() {
        let resolver = TimezoneResolver::new(Arc::new(StubIndex(Some("Mars/Olympus_Mons"))));

        let result = resolver.resolve(10.0, 10.0);

        assert!(
            result
                .error_message()
                .is_some_and(|m| m.starts_with("Failed to determine timezone or time:"))
        );
    }

    #[tokio::test]
    async fn forecast_has_one_record_per_interval() {
        let start = 1_720_396_800;
        let interval = 3600;
        let n = 48;
        let values = (0..n).map(|i| Some(10.0 + i as f64 / 2.0)).collect();
        let provider = StubForecast(HourlySeries {
            start,
            end: start + n * interval,
            interval,
            values,
        });

        let report = ForecastFetcher::new(Arc::new(provider))
            .resolve(51.5, -0.12, "Europe/London")
            .await
            .success()
            .unwrap();

        assert_eq!(report.coordinates, Coordinates::new(51.5, -0.12));
        assert_eq!(report.report.len(), n as usize);
        for (k, record) in report.report.iter().enumerate() {
            assert_eq!(record.date.timestamp(), start + k as i64 * interval);
        }
        assert_eq!(report.report[3].temperature_2m, Some(11.5));
    }

    #[tokio::test]
    async fn forecast_retry_exhaustion_is_an_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(4)
            .mount(&server)
            .await;

        let http = CachedClient::new(
            reqwest::Client::new(),
            RetryPolicy::exponential(3, Duration::from_millis(1)),
            8,
            Duration::from_secs(60),
        );
        let fetcher =
            ForecastFetcher::new(Arc::new(OpenMeteoProvider::new(server.uri(), Arc::new(http))));

        let result = fetcher.resolve(51.5, -0.12, "Europe/London").await;

        assert!(
            result
                .error_message()
                .is_some_and(|m| m.starts_with("Failed to retrieve weather data:"))
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let http = CachedClient::new(
            reqwest::Client::new(),
            RetryPolicy::none(),
            8,
            Duration::from_secs(60),
        );
        let fetcher =
            ForecastFetcher::new(Arc::new(OpenMeteoProvider::new(server.uri(), Arc::new(http))));

        let result = fetcher.resolve(0.0, 0.0, "UTC").await;

        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn overflowing_forecast_timestamps_are_an_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "time": [0_i64, 4_611_686_018_427_387_904_i64, i64::MAX],
                    "temperature_2m": [1.0, 2.0, 3.0]
                }
            })))
            .mount(&server)
            .await;

        let http = CachedClient::new(
            reqwest::Client::new(),
            RetryPolicy::none(),
            8,
            Duration::from_secs(60),
        );
        let fetcher =
            ForecastFetcher::new(Arc::new(OpenMeteoProvider::new(server.uri(), Arc::new(http))));

        let result = fetcher.resolve(0.0, 0.0, "UTC").await;

        assert!(
            result
                .error_message()
                .is_some_and(|m| m.starts_with("Failed to retrieve weather data:"))
        );
    }
}
