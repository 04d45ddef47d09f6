use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::Serialize;
use uuid::Uuid;

use super::content::{Content, FunctionCall, FunctionResponse};
use crate::error::Result;

/// What happened at one step of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    ToolCall(FunctionCall),
    ToolResponse(FunctionResponse),
    /// The model's answer; ends the invocation.
    FinalResponse(Content),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub invocation_id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    pub fn new(invocation_id: &str, author: &str, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            invocation_id: invocation_id.to_string(),
            author: author.to_string(),
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_final_response(&self) -> bool {
        matches!(self.kind, EventKind::FinalResponse(_))
    }
}

/// Ordered events of one invocation; an `Err` item aborts it.
pub type EventStream<'a> = BoxStream<'a, Result<Event>>;
