//! LLM client abstraction.
//!
//! The model decides which tools to call and writes the final answer; this
//! trait is the only seam through which the runner reaches it.

use async_trait::async_trait;

use super::content::{Content, FunctionCall};
use crate::error::Result;
use crate::tools::ToolDefinition;

/// One model turn.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Model-authored content: text and/or function calls.
    pub content: Content,
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { content: Content::model_text(text), finish_reason: Some("STOP".into()) }
    }

    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.content.function_calls()
    }

    #[inline]
    pub fn has_function_calls(&self) -> bool {
        !self.function_calls().is_empty()
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate the next model turn for `contents` under `system_instruction`.
    async fn generate(
        &self,
        system_instruction: &str,
        contents: &[Content],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    fn model(&self) -> &str;
}

/// Scripted LLM for tests: pops one prepared response per call.
#[cfg(test)]
pub(crate) struct ScriptedLlm {
    responses: std::sync::Mutex<std::collections::VecDeque<LlmResponse>>,
    pub(crate) seen: std::sync::Mutex<Vec<Vec<Content>>>,
}

#[cfg(test)]
impl ScriptedLlm {
    pub(crate) fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn tool_call(id: &str, name: &str, args: serde_json::Value) -> LlmResponse {
        LlmResponse {
            content: Content {
                role: super::content::Role::Model,
                parts: vec![super::content::Part::FunctionCall(FunctionCall {
                    id: id.into(),
                    name: name.into(),
                    args,
                })],
            },
            finish_reason: Some("STOP".into()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        _system_instruction: &str,
        contents: &[Content],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.seen.lock().unwrap().push(contents.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| crate::error::Error::Llm("No more scripted responses".into()))
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}
