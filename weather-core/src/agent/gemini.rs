//! Gemini `generateContent` client (API key authentication).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::content::{Content, FunctionCall, Part, Role};
use super::llm::{LlmClient, LlmResponse};
use crate::error::{Error, Result};
use crate::http::truncate_body;
use crate::tools::ToolDefinition;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    /// `timeout` bounds each `generateContent` request.
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn convert_contents(contents: &[Content]) -> Vec<Value> {
        contents
            .iter()
            .map(|content| {
                let role = match content.role {
                    Role::User => "user",
                    Role::Model => "model",
                };

                let parts: Vec<Value> = content
                    .parts
                    .iter()
                    .map(|part| match part {
                        Part::Text(text) => json!({ "text": text }),
                        Part::FunctionCall(call) => json!({
                            "functionCall": { "name": call.name, "args": call.args }
                        }),
                        Part::FunctionResponse(response) => json!({
                            "functionResponse": {
                                "name": response.name,
                                "response": response.response
                            }
                        }),
                    })
                    .collect();

                json!({ "role": role, "parts": parts })
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                })
            })
            .collect();

        Some(json!([{ "functionDeclarations": declarations }]))
    }

    fn parse_response(response: GeminiResponse) -> Result<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("No candidates in response".to_string()))?;

        let mut parts = Vec::new();
        let mut call_index = 0;

        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                parts.push(Part::Text(text));
            }

            if let Some(fc) = part.function_call {
                parts.push(Part::FunctionCall(FunctionCall {
                    id: format!("call_{call_index}"),
                    name: fc.name,
                    args: fc.args,
                }));
                call_index += 1;
            }
        }

        Ok(LlmResponse {
            content: Content { role: Role::Model, parts },
            finish_reason: candidate.finish_reason,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        system_instruction: &str,
        contents: &[Content],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let mut request = json!({
            "contents": Self::convert_contents(contents),
            "generationConfig": {
                "temperature": 0.2,
                "maxOutputTokens": 8192
            }
        });

        if !system_instruction.is_empty() {
            request["systemInstruction"] = json!({ "parts": [{ "text": system_instruction }] });
        }

        if let Some(tool_config) = Self::convert_tools(tools) {
            request["tools"] = tool_config;
        }

        debug!(model = %self.model, turns = contents.len(), "Calling Gemini");

        let response = self
            .client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(Error::Llm(format!(
                "Gemini API error ({status}): {}",
                truncate_body(&body)
            )));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Self::parse_response(gemini_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
