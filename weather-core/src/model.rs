use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Successful payload of the coordinate resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesReport {
    pub coordinates: Coordinates,
}

/// Successful payload of the timezone resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneInfo {
    /// IANA zone identifier, e.g. "America/Santiago".
    pub timezone: String,
    /// ISO-8601 local time with seconds precision and UTC offset.
    pub local_time: String,
}

/// One row of the hourly forecast table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyTemperature {
    pub date: DateTime<Utc>,
    /// Air temperature at 2 m in °C; `None` when the provider has no value.
    pub temperature_2m: Option<f64>,
}

/// Successful payload of the forecast fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub coordinates: Coordinates,
    pub report: Vec<HourlyTemperature>,
}

/// Structured outcome every tool hands back to the agent.
///
/// Serialized with a `status` discriminator so the model can branch on it:
/// `{"status":"success", ...}` or `{"status":"error","error_message":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult<T> {
    Success(T),
    Error { error_message: String },
}

impl<T> ToolResult<T> {
    pub fn error(message: impl Into<String>) -> Self {
        ToolResult::Error { error_message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            ToolResult::Success(value) => Some(value),
            ToolResult::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ToolResult::Success(_) => None,
            ToolResult::Error { error_message } => Some(error_message),
        }
    }
}

impl<T: Serialize> ToolResult<T> {
    /// JSON value handed to the LLM as a function response.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "error_message": format!("Failed to serialize tool result: {e}"),
            })
        })
    }
}
