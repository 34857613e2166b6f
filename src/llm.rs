use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Fixed persona for the scripted chat endpoint. The model is asked to reply
/// as JSON so intent routing stays machine-readable.
const SYSTEM_PROMPT: &str = "You are the in-app assistant of a therapy-session booking platform. \
You help users find available session slots, explain the wallet top-up process, and offer \
general supportive guidance. You never give medical diagnoses. \
Reply ONLY with a JSON object of the shape \
{\"intent\": \"booking\" | \"wallet\" | \"support\" | \"general\", \"reply\": \"<your answer>\"}.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("llm returned an unusable response: {0}")]
    BadResponse(String),
}

/// One prior exchange turn sent as rolling context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// "user" or "assistant"
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub intent: String,
    pub reply: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Thin client over an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        api_url: String,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
            model,
        })
    }

    /// Send the fixed system prompt, the bounded history, and the new user
    /// message; parse the structured intent+reply out of the completion.
    pub async fn reply(
        &self,
        history: &[ChatTurn],
        user_message: &str,
    ) -> Result<ChatReply, LlmError> {
        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        for turn in history {
            messages.push(json!({ "role": turn.role, "content": turn.content }));
        }
        messages.push(json!({ "role": "user", "content": user_message }));

        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": 0.4,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<CompletionResponse>()
            .await?;

        let content = resp
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .ok_or_else(|| LlmError::BadResponse("empty choices".into()))?;

        // Models occasionally return prose despite the instruction; keep the
        // exchange usable by downgrading to a "general" intent.
        match serde_json::from_str::<ChatReply>(content) {
            Ok(parsed) => Ok(parsed),
            Err(_) => Ok(ChatReply {
                intent: "general".to_string(),
                reply: content.to_string(),
            }),
        }
    }
}
