use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the weather core.
///
/// Resolver failures never leave the tool layer as `Error`; they are turned
/// into [`crate::ToolResult::Error`] values. Everything else propagates to the
/// query runner, which reports it as a service error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "GOOGLE_API_KEY is not set. Please set it in your .env file or environment variables."
    )]
    MissingApiKey,

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Timezone error: {0}")]
    Timezone(String),

    #[error("Forecast error: {0}")]
    Forecast(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Session not found: app={app_name}, user={user_id}, session={session_id}")]
    SessionNotFound { app_name: String, user_id: String, session_id: String },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Agent exceeded {0} iterations without a final response")]
    MaxIterations(usize),

    #[error("Request to {url} failed with status {status}: {body}")]
    HttpStatus { url: String, status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
