//! Runner - executes one user message against an agent.
//!
//! The LLM is asked for a turn; every requested function call is executed
//! through the agent's tool registry and fed back, until the model answers
//! without calls. Each step is emitted as an [`Event`].

use async_stream::try_stream;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::LlmAgent;
use super::content::{Content, FunctionResponse, Part, Role};
use super::event::{Event, EventKind, EventStream};
use super::llm::LlmClient;
use super::session::SessionService;
use crate::error::Error;

/// Anything that turns a user message into an event stream.
pub trait AgentRunner: Send + Sync {
    fn run<'a>(&'a self, user_id: &'a str, session_id: &'a str, message: Content)
    -> EventStream<'a>;
}

pub struct Runner {
    app_name: String,
    agent: Arc<LlmAgent>,
    llm: Arc<dyn LlmClient>,
    sessions: Arc<dyn SessionService>,
    max_iterations: usize,
}

impl Runner {
    pub fn new(
        app_name: impl Into<String>,
        agent: Arc<LlmAgent>,
        llm: Arc<dyn LlmClient>,
        sessions: Arc<dyn SessionService>,
    ) -> Self {
        Self { app_name: app_name.into(), agent, llm, sessions, max_iterations: 10 }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }
}

impl AgentRunner for Runner {
    fn run<'a>(
        &'a self,
        user_id: &'a str,
        session_id: &'a str,
        message: Content,
    ) -> EventStream<'a> {
        Box::pin(try_stream! {
            let invocation_id = Uuid::new_v4().to_string();
            let author = self.agent.name.as_str();
            let session = self.sessions.get_session(&self.app_name, user_id, session_id).await?;
            let tools = self.agent.tools.definitions();

            info!(%invocation_id, user_id, session_id, model = self.llm.model(), "Running agent");

            // Contents produced during this invocation, persisted once it completes.
            let mut turn = vec![message];
            let mut answer = None;

            for iteration in 1..=self.max_iterations {
                debug!(%invocation_id, iteration, "Agent iteration");

                let mut contents = session.history.clone();
                contents.extend(turn.iter().cloned());

                let response =
                    self.llm.generate(&self.agent.instruction, &contents, &tools).await?;
                let calls = response.function_calls();
                turn.push(response.content.clone());

                if calls.is_empty() {
                    answer = Some(response.content);
                    break;
                }

                let mut parts = Vec::with_capacity(calls.len());
                for call in calls {
                    yield Event::new(&invocation_id, author, EventKind::ToolCall(call.clone()));

                    let result = self.agent.tools.execute(&call.name, call.args.clone()).await;
                    let response =
                        FunctionResponse { id: call.id, name: call.name, response: result };

                    yield Event::new(
                        &invocation_id,
                        author,
                        EventKind::ToolResponse(response.clone()),
                    );
                    parts.push(Part::FunctionResponse(response));
                }
                turn.push(Content { role: Role::User, parts });
            }

            match answer {
                Some(content) => {
                    self.sessions
                        .append_history(&self.app_name, user_id, session_id, turn)
                        .await?;
                    yield Event::new(&invocation_id, author, EventKind::FinalResponse(content));
                }
                None => Err::<(), Error>(Error::MaxIterations(self.max_iterations))?,
            }
        })
    }
}
