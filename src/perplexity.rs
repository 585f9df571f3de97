use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;

const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 200;

pub const SYSTEM_PROMPT: &str = "You are Serenity, an AI mental wellness companion. \
Respond with empathy and compassion. \
Keep responses concise and helpful. \
Offer practical wellness advice when appropriate. \
If someone appears to be in crisis, encourage them to seek professional help.";

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// A chat-completion backend. The engine only talks to this trait so tests
/// can swap in a scripted model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat_completion(
        &self,
        api_key: &str,
        history: Vec<ChatMessage>,
        user_message: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct PerplexityClient {
    client: Client,
    model: String,
}

impl PerplexityClient {
    pub fn new(model: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

/// System prompt, prior turns, then the new user message
fn build_messages(history: Vec<ChatMessage>, user_message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", SYSTEM_PROMPT));
    messages.extend(history);
    messages.push(ChatMessage::new("user", user_message));
    messages
}

#[async_trait]
impl LanguageModel for PerplexityClient {
    async fn chat_completion(
        &self,
        api_key: &str,
        history: Vec<ChatMessage>,
        user_message: &str,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_messages(history, user_message),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(PERPLEXITY_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Perplexity API error ({}): {}", status, error_text).into());
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| "No response from Perplexity".into())
    }
}
