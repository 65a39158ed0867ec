//! HTTP narrative client
//!
//! Talks to either the Anthropic messages API or any OpenAI-compatible chat
//! endpoint. Several models can be configured; a rate-limited model hands the
//! request to the next one.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::error::{NacioError, Result};
use crate::narrative::NarrativeService;
use crate::turn::TurnResult;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const MAX_TOKENS: u32 = 1024;

const SYSTEM_PROMPT: &str = "You are the cabinet chronicler of a grand-strategy game. \
You receive the outcome of one simulated year as JSON. Write a short briefing of at \
most two paragraphs covering wars, era changes, crises and the balance of power. \
Describe only what the data shows; never invent statistics.";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

impl ApiFormat {
    fn detect(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }
}

pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    /// Tried in order
    models: Vec<String>,
    api_format: ApiFormat,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, models: Vec<String>) -> Self {
        let api_format = ApiFormat::detect(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            models,
            api_format,
        }
    }

    /// Build from the environment
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (Anthropic by default)
    /// Optional: LLM_MODEL, a comma-separated failover list
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| NacioError::Narrative("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let models = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Ok(Self::new(api_key, api_url, parse_models(&models)))
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Complete with each model in turn until one answers
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        for model in &self.models {
            let attempt = match self.api_format {
                ApiFormat::Anthropic => self.complete_anthropic(model, system, user).await?,
                ApiFormat::OpenAI => self.complete_openai(model, system, user).await?,
            };
            match attempt {
                Some(text) => return Ok(text),
                None => tracing::warn!(model = %model, "Model rate limited, trying next"),
            }
        }
        Err(NacioError::Narrative(
            "every configured model is unavailable".into(),
        ))
    }

    /// `Ok(None)` when the model is rate limited
    async fn complete_anthropic(&self, model: &str, system: &str, user: &str) -> Result<Option<String>> {
        let request = AnthropicRequest {
            model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| NacioError::Narrative(e.to_string()))?;

        let Some(response) = check_status(response).await? else {
            return Ok(None);
        };
        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| NacioError::Narrative(e.to_string()))?;

        completion
            .content
            .into_iter()
            .next()
            .map(|c| Some(c.text))
            .ok_or_else(|| NacioError::Narrative("Empty response".into()))
    }

    async fn complete_openai(&self, model: &str, system: &str, user: &str) -> Result<Option<String>> {
        let request = OpenAIRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NacioError::Narrative(e.to_string()))?;

        let Some(response) = check_status(response).await? else {
            return Ok(None);
        };
        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| NacioError::Narrative(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| Some(c.message.content))
            .ok_or_else(|| NacioError::Narrative("Empty response".into()))
    }
}

impl NarrativeService for LlmClient {
    async fn describe(&self, result: &TurnResult) -> Result<String> {
        let prompt = briefing_prompt(result)?;
        self.complete(SYSTEM_PROMPT, &prompt).await
    }
}

/// User message for one turn: the digest followed by the full result
pub fn briefing_prompt(result: &TurnResult) -> Result<String> {
    Ok(format!(
        "{}\nFull turn data:\n{}",
        result.summary(),
        serde_json::to_string(result)?
    ))
}

fn parse_models(list: &str) -> Vec<String> {
    let models: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect();
    if models.is_empty() {
        vec![DEFAULT_MODEL.to_string()]
    } else {
        models
    }
}

async fn check_status(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Ok(None);
    }
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(NacioError::Narrative(format!("API error {}: {}", status, error_text)));
    }
    Ok(Some(response))
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        let anthropic = LlmClient::new("k".into(), DEFAULT_API_URL.into(), vec!["m".into()]);
        assert_eq!(anthropic.api_format, ApiFormat::Anthropic);
        let compatible = LlmClient::new(
            "k".into(),
            "https://api.deepseek.com/chat/completions".into(),
            vec!["m".into()],
        );
        assert_eq!(compatible.api_format, ApiFormat::OpenAI);
    }

    #[test]
    fn test_model_list_parsing() {
        assert_eq!(parse_models("a, b,,c "), vec!["a", "b", "c"]);
        assert_eq!(parse_models(" , "), vec![DEFAULT_MODEL]);
    }
}
