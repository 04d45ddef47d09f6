//! Query runner - one user text in, one answer out.
//!
//! Resolves (or creates) the session, dispatches the text to the agent
//! runner and scans the event stream for the final answer.

use futures::TryStreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::agent::{AgentRunner, Content, EventKind, EventStream, SessionService};
use crate::error::{Error, Result};

/// Answer used when the agent finished without any text.
pub const NO_RESPONSE: &str = "No response received.";

/// Outcome of a scan over an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drained {
    /// Text of the first final response that had any.
    Answer(String),
    /// Final response(s) arrived, none with text.
    EmptyFinal,
    /// The stream ended without a final response.
    NoFinal,
}

impl Drained {
    pub fn into_response(self) -> String {
        match self {
            Drained::Answer(text) => text,
            Drained::EmptyFinal | Drained::NoFinal => NO_RESPONSE.to_string(),
        }
    }
}

/// Consume `events` until the first final response carrying text.
///
/// An `Err` item aborts the scan.
pub async fn drain(mut events: EventStream<'_>) -> Result<Drained> {
    let mut saw_final = false;

    while let Some(event) = events.try_next().await? {
        match &event.kind {
            EventKind::FinalResponse(content) => match content.text() {
                Some(text) => return Ok(Drained::Answer(text.to_string())),
                None => saw_final = true,
            },
            EventKind::ToolCall(call) => debug!(tool = %call.name, "Tool call"),
            EventKind::ToolResponse(response) => debug!(tool = %response.name, "Tool response"),
        }
    }

    Ok(if saw_final { Drained::EmptyFinal } else { Drained::NoFinal })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub response: String,
    /// Id of the session the query actually ran in.
    pub session_id: String,
}

/// Uniform failure of a query.
#[derive(Debug, Error)]
#[error("Error processing query: {0}")]
pub struct QueryError(#[source] pub Error);

pub struct QueryRunner {
    app_name: String,
    sessions: Arc<dyn SessionService>,
    runner: Arc<dyn AgentRunner>,
}

impl QueryRunner {
    pub fn new(
        app_name: impl Into<String>,
        sessions: Arc<dyn SessionService>,
        runner: Arc<dyn AgentRunner>,
    ) -> Self {
        Self { app_name: app_name.into(), sessions, runner }
    }

    pub async fn run(
        &self,
        query: &str,
        user_id: &str,
        session_id: &str,
    ) -> std::result::Result<QueryOutcome, QueryError> {
        self.try_run(query, user_id, session_id).await.map_err(|e| {
            error!(error = %e, user_id, session_id, "Error in query");
            QueryError(e)
        })
    }

    async fn try_run(&self, query: &str, user_id: &str, session_id: &str) -> Result<QueryOutcome> {
        let session_id = self.resolve_session(user_id, session_id).await?;
        info!(user_id, session_id = %session_id, "Processing query");

        let events = self.runner.run(user_id, &session_id, Content::user_text(query));
        let drained = drain(events).await?;

        match &drained {
            Drained::Answer(_) => {}
            Drained::EmptyFinal => warn!(session_id = %session_id, "Final response had no text"),
            Drained::NoFinal => warn!(session_id = %session_id, "No final response event"),
        }

        Ok(QueryOutcome { response: drained.into_response(), session_id })
    }

    /// Existing session id, or the id of a session created for the request.
    async fn resolve_session(&self, user_id: &str, session_id: &str) -> Result<String> {
        match self.sessions.get_session(&self.app_name, user_id, session_id).await {
            Ok(session) => {
                debug!(session_id = %session.id, "Using existing session");
                Ok(session.id)
            }
            Err(e) => {
                info!(reason = %e, "Session not found, creating new session");
                let session =
                    self.sessions.create_session(&self.app_name, user_id, Some(session_id)).await?;
                Ok(session.id)
            }
        }
    }
}
