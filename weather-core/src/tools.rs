//! Tool registry - the functions the agent may call.
//!
//! Every tool answers with a serialized [`ToolResult`]; argument errors and
//! unknown tool names are reported the same way so the model can react.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

use crate::model::ToolResult;
use crate::resolver::{CoordinateResolver, ForecastFetcher, TimezoneResolver};

/// Tool declaration handed to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses in function calls.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Run the tool. Always returns a `ToolResult`-shaped value.
    async fn execute(&self, args: Value) -> Value;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Registered tools, kept in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Arc::new(tool));
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub async fn execute(&self, name: &str, args: Value) -> Value {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.execute(args).await,
            None => {
                warn!(tool = name, "Model requested an unknown tool");
                error_value(format!("Unknown tool: {name}"))
            }
        }
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.tool_names()).finish()
    }
}

fn error_value(message: String) -> Value {
    json!({ "status": "error", "error_message": message })
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, Value> {
    serde_json::from_value(args)
        .map_err(|e| error_value(format!("Invalid arguments for {tool}: {e}")))
}

fn encode<T: Serialize>(result: ToolResult<T>) -> Value {
    result.to_value()
}

/// Registry with the three weather tools.
pub fn weather_tools(
    coordinates: CoordinateResolver,
    timezone: TimezoneResolver,
    forecast: ForecastFetcher,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(GetCoordinatesTool { resolver: coordinates });
    registry.register(GetLocalTimeInfoTool { resolver: timezone });
    registry.register(GetWeatherForecastTool { resolver: forecast });
    registry
}

#[derive(Deserialize)]
struct CoordinatesArgs {
    city: String,
    #[serde(default)]
    country: String,
}

pub struct GetCoordinatesTool {
    resolver: CoordinateResolver,
}

#[async_trait]
impl Tool for GetCoordinatesTool {
    fn name(&self) -> &str {
        "get_coordinates"
    }

    fn description(&self) -> &str {
        "Retrieves the geographic coordinates (latitude and longitude) of a specified city. \
         Returns a 'status' of 'success' with 'coordinates', or 'error' with 'error_message'."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The name of the city (e.g., \"New York\", \"London\")."
                },
                "country": {
                    "type": "string",
                    "description": "Optional country name to disambiguate (e.g., \"USA\", \"UK\")."
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, args: Value) -> Value {
        match parse_args::<CoordinatesArgs>(self.name(), args) {
            Ok(args) => encode(self.resolver.resolve(&args.city, &args.country).await),
            Err(err) => err,
        }
    }
}

#[derive(Deserialize)]
struct LocalTimeArgs {
    latitude: f64,
    longitude: f64,
}

pub struct GetLocalTimeInfoTool {
    resolver: TimezoneResolver,
}

#[async_trait]
impl Tool for GetLocalTimeInfoTool {
    fn name(&self) -> &str {
        "get_local_time_info"
    }

    fn description(&self) -> &str {
        "Retrieves the IANA timezone and current local time for the given coordinates. \
         Returns 'timezone' and 'local_time' on success."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number", "description": "Latitude of the location." },
                "longitude": { "type": "number", "description": "Longitude of the location." }
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn execute(&self, args: Value) -> Value {
        match parse_args::<LocalTimeArgs>(self.name(), args) {
            Ok(args) => encode(self.resolver.resolve(args.latitude, args.longitude)),
            Err(err) => err,
        }
    }
}

#[derive(Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
    timezone: String,
}

pub struct GetWeatherForecastTool {
    resolver: ForecastFetcher,
}

#[async_trait]
impl Tool for GetWeatherForecastTool {
    fn name(&self) -> &str {
        "get_weather_forecast"
    }

    fn description(&self) -> &str {
        "Fetches the hourly temperature forecast for a location using the Open-Meteo API. \
         Returns 'coordinates' and a 'report' list of {date, temperature_2m} rows on success."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": { "type": "number", "description": "Latitude of the location." },
                "longitude": { "type": "number", "description": "Longitude of the location." },
                "timezone": {
                    "type": "string",
                    "description": "Timezone string (e.g., 'America/Santiago')."
                }
            },
            "required": ["latitude", "longitude", "timezone"]
        })
    }

    async fn execute(&self, args: Value) -> Value {
        match parse_args::<ForecastArgs>(self.name(), args) {
            Ok(args) => encode(
                self.resolver.resolve(args.latitude, args.longitude, &args.timezone).await,
            ),
            Err(err) => err,
        }
    }
}
