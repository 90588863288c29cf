use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Single-shot text generation with a role (system prompt) and an
/// instruction. Every pipeline stage is one call through this seam, so
/// tests can substitute a stub.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, role: &str, instruction: &str) -> Result<String>;
}

/// Text → fixed-length vector. Never fails: embedding errors degrade to a
/// zero vector so retrieval can answer "no relevant policy" instead of
/// crashing the pipeline.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}

pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    embed_model: String,
    embed_dim: usize,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = dotenv::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let embed_model = dotenv::var("LLM_EMBED_MODEL")
            .unwrap_or_else(|_| "text-embedding-ada-002".to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            embed_model,
            embed_dim: 1536,
            api_key,
        })
    }

    /// Resolve an endpoint path from the base URL.
    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/{}", base, path)
        } else {
            format!("{}/v1/{}", base, path)
        }
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": 2048,
        });

        let req = self.authed(self.client.post(self.endpoint("chat/completions")).json(&body));

        let resp = req.send().await.context("LLM request failed")?;
        let text = resp.text().await.context("Failed to read LLM response")?;
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        // Extract content from choices[0].message.content (handle null)
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(content)
    }

    async fn try_embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.embed_model,
            "input": [text],
        });

        let req = self.authed(self.client.post(self.endpoint("embeddings")).json(&body));

        let resp = req.send().await.context("Embedding request failed")?;
        let text = resp
            .text()
            .await
            .context("Failed to read embedding response")?;
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse embedding JSON")?;

        let values = json["data"]
            .get(0)
            .and_then(|d| d["embedding"].as_array())
            .context("Embedding response missing data[0].embedding")?;

        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .context("Non-numeric embedding value")
            })
            .collect()
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, role: &str, instruction: &str) -> Result<String> {
        let messages = vec![Message::system(role), Message::user(instruction)];
        self.chat(&messages).await
    }
}

#[async_trait]
impl Embedder for LlmClient {
    async fn embed(&self, text: &str) -> Vec<f32> {
        match self.try_embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Embedding failed, degrading to zero vector");
                vec![0.0; self.embed_dim]
            }
        }
    }
}
