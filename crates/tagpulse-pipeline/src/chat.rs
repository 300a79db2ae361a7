//! OpenAI-compatible chat-completions client used to answer questions about
//! an analysis.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{ChatResponder, ChatTurn};

const SYSTEM_PROMPT: &str = "You answer questions about social-media posts collected for one \
hashtag. Use only the numbered posts below. If they do not contain the answer, say so.";

pub struct OpenAiChat {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    /// Client for `{base_url}/v1/chat/completions`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.map(str::to_owned),
            model: model.to_owned(),
        })
    }
}

/// System message with the retrieved posts appended as a numbered list.
fn system_message(context: &[&str]) -> String {
    let mut content = String::from(SYSTEM_PROMPT);
    content.push_str("\n\nPosts:");
    for (i, text) in context.iter().enumerate() {
        content.push_str(&format!("\n{}. {}", i + 1, text));
    }
    content
}

impl ChatResponder for OpenAiChat {
    async fn answer(
        &self,
        question: &str,
        context: &[&str],
        history: &[ChatTurn],
    ) -> Result<String, PipelineError> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message {
            role: "system",
            content: system_message(context).into(),
        });
        for turn in history {
            messages.push(Message {
                role: "user",
                content: turn.question.as_str().into(),
            });
            messages.push(Message {
                role: "assistant",
                content: turn.answer.as_str().into(),
            });
        }
        messages.push(Message {
            role: "user",
            content: question.into(),
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.2,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(PipelineError::Chat(format!(
                "chat endpoint returned status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Chat(format!("chat response parse error: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::Chat("chat response had no content".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_numbers_context() {
        let message = system_message(&["first post", "second post"]);
        assert!(message.starts_with(SYSTEM_PROMPT));
        assert!(message.ends_with("Posts:\n1. first post\n2. second post"));
    }
}
