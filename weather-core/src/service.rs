//! The assembled weather agent, built once at startup and shared.

use std::sync::Arc;
use tracing::info;

use crate::agent::{
    AgentRunner, GeminiClient, InMemorySessionService, LlmAgent, LlmClient, Runner,
    SessionService,
};
use crate::config::Config;
use crate::error::Result;
use crate::http::CachedClient;
use crate::provider::{NominatimGeocoder, OpenMeteoProvider, TzfIndex};
use crate::query::{QueryError, QueryOutcome, QueryRunner};
use crate::resolver::{CoordinateResolver, ForecastFetcher, TimezoneResolver};
use crate::tools::weather_tools;

pub struct WeatherAgentService {
    app_name: String,
    model: String,
    queries: QueryRunner,
}

impl WeatherAgentService {
    /// Wire providers, tools, agent, session store and runner from `config`.
    ///
    /// Fails with [`crate::Error::MissingApiKey`] when no credential is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?;

        let http = Arc::new(CachedClient::from_config(&config.http)?);
        let geocoder = NominatimGeocoder::new(
            config.providers.geocoding_url.as_str(),
            config.providers.geocoding_user_agent.as_str(),
            http.clone(),
        );
        let forecast = OpenMeteoProvider::new(config.providers.forecast_url.as_str(), http);

        let tools = weather_tools(
            CoordinateResolver::new(Arc::new(geocoder)),
            TimezoneResolver::new(Arc::new(TzfIndex::new())),
            ForecastFetcher::new(Arc::new(forecast)),
        );
        let agent = Arc::new(LlmAgent::weather(&config.model, tools));
        info!(agent = %agent.name, tools = ?agent.tools.tool_names(), "Agent created");

        let llm: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(
            &config.providers.llm_url,
            api_key,
            &config.model,
            config.http.timeout(),
        )?);
        let sessions: Arc<dyn SessionService> = Arc::new(InMemorySessionService::new());
        let runner = Runner::new(&config.app_name, agent, llm, sessions.clone())
            .with_max_iterations(config.max_iterations);

        Ok(Self::from_parts(&config.app_name, &config.model, sessions, Arc::new(runner)))
    }

    /// Assemble around an existing session store and runner.
    pub fn from_parts(
        app_name: &str,
        model: &str,
        sessions: Arc<dyn SessionService>,
        runner: Arc<dyn AgentRunner>,
    ) -> Self {
        Self {
            app_name: app_name.to_string(),
            model: model.to_string(),
            queries: QueryRunner::new(app_name, sessions, runner),
        }
    }

    pub async fn query(
        &self,
        query: &str,
        user_id: &str,
        session_id: &str,
    ) -> std::result::Result<QueryOutcome, QueryError> {
        self.queries.run(query, user_id, session_id).await
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Nothing is buffered; sessions die with the process.
    pub fn shutdown(&self) {
        info!(app_name = %self.app_name, "Shutting down Weather Agent");
    }
}
