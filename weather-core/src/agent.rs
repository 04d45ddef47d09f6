//! Agent runtime: the LLM-driven loop that picks tools and writes the answer.
//!
//! - [`content`]: conversation turns exchanged with the model
//! - [`llm`]: the [`LlmClient`] seam, implemented by [`GeminiClient`]
//! - [`session`]: conversation persistence
//! - [`runner`]: executes one message and emits [`Event`]s

pub mod content;
pub mod event;
pub mod gemini;
pub mod llm;
pub mod runner;
pub mod session;

pub use content::{Content, FunctionCall, FunctionResponse, Part, Role};
pub use event::{Event, EventKind, EventStream};
pub use gemini::GeminiClient;
pub use llm::{LlmClient, LlmResponse};
pub use runner::{AgentRunner, Runner};
pub use session::{InMemorySessionService, Session, SessionService};

use crate::tools::ToolRegistry;

pub const WEATHER_AGENT_NAME: &str = "weather_agent_v1";

/// System instruction of the weather agent.
pub const INSTRUCTION: &str = r#"
You are a helpful weather assistant.

When a user asks for the weather in a city, follow these steps using the available tools:

1. Use `get_coordinates(city, country)` to retrieve the geographic coordinates (latitude and longitude) of the location.
2. Use `get_local_time_info(latitude, longitude)` to determine the timezone of the location.
3. Then use `get_weather_forecast(latitude, longitude, timezone)` to get the hourly weather forecast.
4. If any tool returns an error, politely inform the user that the data couldn't be retrieved.
5. If the forecast is available:
   - Mention the city and country.
   - Display the next few hourly temperature readings in a clear format (e.g., "14:00 - 17°C").
   - Keep your response concise and user-friendly.
6. Never fabricate data. Only use information returned by the tools.
"#;

/// An LLM agent: identity, instruction and the tools it may call.
#[derive(Debug)]
pub struct LlmAgent {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub tools: ToolRegistry,
}

impl LlmAgent {
    /// The weather assistant bound to `tools`.
    pub fn weather(model: &str, tools: ToolRegistry) -> Self {
        Self {
            name: WEATHER_AGENT_NAME.to_string(),
            model: model.to_string(),
            description: "Provides weather information for any city.".to_string(),
            instruction: INSTRUCTION.trim().to_string(),
            tools,
        }
    }
}
