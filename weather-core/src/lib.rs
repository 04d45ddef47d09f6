//! Core library for the weather agent.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Location, timezone and forecast resolution behind provider traits
//! - The tools exposed to the LLM agent and the agent runtime
//! - The query runner that turns one user text into one answer
//!
//! It is used by `weather-api`, but can also be reused by other binaries or services.

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod provider;
pub mod query;
pub mod resolver;
pub mod service;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{Coordinates, ToolResult};
pub use query::{NO_RESPONSE, QueryError, QueryOutcome, QueryRunner};
pub use service::WeatherAgentService;
